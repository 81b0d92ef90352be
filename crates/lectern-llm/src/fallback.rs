//! Templated offline study packs
//!
//! When every live backend is degraded, or a backend's answer fails
//! structural validation, dispatch serves one of these locally
//! generated packs instead. Packs are keyed off the classification
//! tags only, so the same question class always yields the same
//! content, and every pack satisfies the default validation rules.

use std::collections::BTreeSet;

use lectern_routing::DomainTag;
use serde_json::json;

/// Name reported in the `provider` field when a pack is served
pub const FALLBACK_PROVIDER: &str = "offline-fallback";

/// Name reported in the `model` field when a pack is served
pub const FALLBACK_MODEL: &str = "templated-study-pack";

struct PackTemplate {
    topic: &'static str,
    knowledge_points: [&'static str; 3],
    experiments: [&'static str; 2],
    platform_name: &'static str,
    platform_url: &'static str,
}

const ELECTRONICS: PackTemplate = PackTemplate {
    topic: "circuits and control systems",
    knowledge_points: [
        "Kirchhoff's laws govern how current and voltage distribute across any circuit network",
        "Feedback control compares a measured output against a setpoint and corrects the difference",
        "A PID controller combines proportional, integral, and derivative terms to shape the correction",
    ],
    experiments: [
        "Build a voltage divider and verify the output against the resistor ratio",
        "Simulate a closed-loop controller and observe how each gain term changes the step response",
    ],
    platform_name: "CircuitJS",
    platform_url: "https://www.falstad.com/circuit/circuitjs.html",
};

const MATH: PackTemplate = PackTemplate {
    topic: "mathematical methods",
    knowledge_points: [
        "A derivative measures the instantaneous rate of change of a function at a point",
        "An integral accumulates quantities and recovers totals from rates of change",
        "Linear systems can be organized as matrices and solved by systematic elimination",
    ],
    experiments: [
        "Plot a function together with its derivative and relate slopes to turning points",
        "Approximate a definite integral with rectangles and refine the partition",
    ],
    platform_name: "Desmos",
    platform_url: "https://www.desmos.com/calculator",
};

const PHYSICS: PackTemplate = PackTemplate {
    topic: "physical principles",
    knowledge_points: [
        "Newton's second law relates net force, mass, and acceleration in every mechanical system",
        "Energy is conserved; it changes form between kinetic, potential, and thermal stores",
        "Waves transport energy without transporting matter, characterized by frequency and wavelength",
    ],
    experiments: [
        "Simulate projectile motion and compare the trajectory against the kinematic equations",
        "Vary the length of a pendulum and measure how the period responds",
    ],
    platform_name: "PhET",
    platform_url: "https://phet.colorado.edu/",
};

const CHEMISTRY: PackTemplate = PackTemplate {
    topic: "chemical foundations",
    knowledge_points: [
        "The periodic table organizes elements by atomic number and recurring chemical behavior",
        "Chemical reactions conserve mass; balancing equations accounts for every atom",
        "Acids donate protons and bases accept them; pH quantifies the balance in solution",
    ],
    experiments: [
        "Model a molecule in three dimensions and inspect its bond geometry",
        "Titrate an acid against a base and plot the pH curve around the equivalence point",
    ],
    platform_name: "MolView",
    platform_url: "https://molview.org/",
};

const BIOLOGY: PackTemplate = PackTemplate {
    topic: "biological systems",
    knowledge_points: [
        "Cells are the basic unit of life; their organelles divide labor within the cell",
        "DNA encodes heritable information that is transcribed to RNA and translated to protein",
        "Natural selection changes allele frequencies in populations across generations",
    ],
    experiments: [
        "Trace the flow of genetic information from a gene sequence to a folded protein",
        "Run a population simulation and observe selection pressure on a single trait",
    ],
    platform_name: "PhET",
    platform_url: "https://phet.colorado.edu/",
};

const CODE: PackTemplate = PackTemplate {
    topic: "programming fundamentals",
    knowledge_points: [
        "Decompose a problem into small functions with clear inputs and outputs before coding",
        "Choose data structures by the operations you need; access patterns dominate performance",
        "Reproduce a bug with the smallest possible input before attempting a fix",
    ],
    experiments: [
        "Implement the same algorithm iteratively and recursively and compare the call behavior",
        "Inspect the generated output of a small program under different optimization settings",
    ],
    platform_name: "Compiler Explorer",
    platform_url: "https://godbolt.org/",
};

const GENERAL: PackTemplate = PackTemplate {
    topic: "general study guidance",
    knowledge_points: [
        "Break an unfamiliar problem into named sub-questions you can attack independently",
        "Work a fully-solved example before attempting the variant you were given",
        "Explain your current understanding out loud to expose the step that is missing",
    ],
    experiments: [
        "Construct the simplest version of the problem that still shows the behavior",
        "Change one variable at a time and record how the outcome responds",
    ],
    platform_name: "GeoGebra",
    platform_url: "https://www.geogebra.org/",
};

fn template_for(tags: &BTreeSet<DomainTag>) -> &'static PackTemplate {
    // first subject tag wins; the language tag carries no subject
    for tag in tags {
        match tag {
            DomainTag::Math => return &MATH,
            DomainTag::Code => return &CODE,
            DomainTag::Electronics => return &ELECTRONICS,
            DomainTag::Physics => return &PHYSICS,
            DomainTag::Chemistry => return &CHEMISTRY,
            DomainTag::Biology => return &BIOLOGY,
            DomainTag::Chinese => {}
        }
    }
    &GENERAL
}

/// Render the study pack for a classified question
///
/// The output is a JSON document that always clears the default
/// validation rules, so serving it never re-enters the fallback path.
#[must_use]
pub fn study_pack(tags: &BTreeSet<DomainTag>) -> String {
    let template = template_for(tags);
    let pack = json!({
        "topic": template.topic,
        "knowledge_points": template.knowledge_points,
        "experiments": template.experiments,
        "simulation_platform": {
            "name": template.platform_name,
            "url": template.platform_url,
        },
        "note": "Live answer generation is temporarily unavailable; this is a curated study outline.",
    });
    serde_json::to_string_pretty(&pack).expect("static JSON document serializes")
}
