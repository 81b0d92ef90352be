use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Subject domain recognized in a question
///
/// Variant order fixes the iteration order of tag sets, which keeps
/// classification output and selection reasons deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DomainTag {
    /// Mathematics: equations, calculus, linear algebra, statistics
    Math,
    /// Programming and software questions
    Code,
    /// Circuits, signals, and control systems
    Electronics,
    /// Physics
    Physics,
    /// Chemistry
    Chemistry,
    /// Biology
    Biology,
    /// Substantial Chinese-language content
    Chinese,
}

/// Outcome of classifying one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Every domain whose keyword set matched, in tag order
    pub tags: BTreeSet<DomainTag>,
    /// Whether the question exceeds the configured length threshold
    pub complex: bool,
}

impl Classification {
    /// Whether no domain matched
    #[must_use]
    pub fn is_general(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Keyword vocabulary per domain, checked against the lowercased text
const DOMAIN_KEYWORDS: &[(DomainTag, &[&str])] = &[
    (
        DomainTag::Math,
        &[
            "数学", "方程", "计算", "积分", "微分", "导数", "矩阵", "向量", "概率", "统计", "几何",
            "代数", "三角函数", "极限", "级数", "equation", "integral", "derivative", "matrix",
            "probability", "theorem", "algebra", "calculus", "geometry",
        ],
    ),
    (
        DomainTag::Code,
        &[
            "代码", "编程", "算法", "程序", "函数", "调试", "编译", "接口", "变量", "循环", "递归",
            "数据结构", "code", "program", "algorithm", "debug", "compile", "refactor", "python",
            "rust", "javascript",
        ],
    ),
    (
        DomainTag::Electronics,
        &[
            "电路", "电子", "电压", "电流", "电阻", "电容", "电感", "晶体管", "二极管", "运放",
            "逻辑门", "数字电路", "模拟电路", "信号", "滤波", "示波器", "控制系统", "反馈", "pid",
            "circuit", "voltage", "resistor", "capacitor", "transistor", "amplifier", "oscilloscope",
            "feedback",
        ],
    ),
    (
        DomainTag::Physics,
        &[
            "物理", "力学", "热力学", "电磁", "光学", "量子", "相对论", "能量", "动量", "加速度",
            "波动", "振动", "physics", "momentum", "quantum", "thermodynamic", "kinematic",
            "relativity",
        ],
    ),
    (
        DomainTag::Chemistry,
        &[
            "化学", "元素", "分子", "原子", "化合物", "反应", "酸碱", "氧化", "还原", "溶液",
            "浓度", "催化", "chemistry", "molecule", "compound", "oxidation", "titration",
            "stoichiometry",
        ],
    ),
    (
        DomainTag::Biology,
        &[
            "生物", "细胞", "基因", "蛋白质", "dna", "rna", "酶", "代谢", "遗传", "进化", "生态",
            "微生物", "光合作用", "biology", "cell", "gene", "protein", "enzyme", "photosynthesis",
            "mitosis",
        ],
    ),
];

/// Ten or more consecutive Han characters mark substantial Chinese text
static HAN_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Han}{10,}").expect("must be valid regex"));

/// Classify a question into subject domains
///
/// Matching is keyword-based over the lowercased text, so the result is
/// a pure function of the input: the same prompt always produces the
/// same tag set. A question with no matches is general-purpose and
/// carries an empty tag set. `complexity_threshold` is compared against
/// the character count, not the byte length, so CJK text is not
/// penalized.
#[must_use]
pub fn classify(text: &str, complexity_threshold: usize) -> Classification {
    let lowered = text.to_lowercase();

    let mut tags = BTreeSet::new();
    for &(tag, keywords) in DOMAIN_KEYWORDS {
        if keywords.iter().any(|kw| lowered.contains(kw)) {
            tags.insert(tag);
        }
    }

    if HAN_RUN_RE.is_match(text) {
        tags.insert(DomainTag::Chinese);
    }

    let complex = text.chars().count() > complexity_threshold;

    Classification { tags, complex }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: usize = 200;

    fn tags_of(text: &str) -> Vec<DomainTag> {
        classify(text, THRESHOLD).tags.into_iter().collect()
    }

    #[test]
    fn math_keywords_tag_math() {
        assert_eq!(tags_of("solve this integral for me"), [DomainTag::Math]);
        assert_eq!(tags_of("帮我求这个方程的解"), [DomainTag::Math]);
    }

    #[test]
    fn control_system_question_tags_electronics() {
        assert_eq!(tags_of("请设计一个PID反馈控制系统"), [DomainTag::Electronics]);
    }

    #[test]
    fn multi_domain_question_collects_all_tags() {
        let tags = tags_of("write code to compute the integral of a voltage waveform");
        assert_eq!(tags, [DomainTag::Math, DomainTag::Code, DomainTag::Electronics]);
    }

    #[test]
    fn long_han_run_tags_chinese() {
        assert_eq!(tags_of("请解释一下光合作用的基本过程是什么"), [
            DomainTag::Biology,
            DomainTag::Chinese
        ]);
    }

    #[test]
    fn short_han_run_does_not_tag_chinese() {
        // nine Han characters, below the run length cutoff
        assert_eq!(tags_of("什么是电压和电流呢"), [DomainTag::Electronics]);
    }

    #[test]
    fn unmatched_text_is_general() {
        let result = classify("what should I have for lunch", THRESHOLD);
        assert!(result.is_general());
        assert!(!result.complex);
    }

    #[test]
    fn complexity_counts_characters_not_bytes() {
        // 201 Han characters: over the threshold by count, far over by bytes
        let long = "学".repeat(201);
        assert!(classify(&long, THRESHOLD).complex);
        // 200 exactly is not complex
        let edge = "学".repeat(200);
        assert!(!classify(&edge, THRESHOLD).complex);
    }

    #[test]
    fn classification_is_deterministic() {
        let prompt = "用python写一个计算电路功率的程序";
        let first = classify(prompt, THRESHOLD);
        for _ in 0..10 {
            assert_eq!(classify(prompt, THRESHOLD), first);
        }
    }

    #[test]
    fn keyword_matching_is_case_insensitive() {
        assert_eq!(tags_of("Design a PID Feedback loop"), [DomainTag::Electronics]);
    }
}
