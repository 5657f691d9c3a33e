//! Static reference material: common packaging classes and how to dispose of
//! them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuideEntry {
    pub name: &'static str,
    pub recyclable: bool,
    pub biodegradable: bool,
    pub description: &'static str,
    pub tips: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub materials: &'static [GuideEntry],
    pub general_tips: &'static [&'static str],
}

pub const MATERIALS: [GuideEntry; 6] = [
    GuideEntry {
        name: "Plastic (PET)",
        recyclable: true,
        biodegradable: false,
        description: "Commonly used for beverage bottles. Highly recyclable but takes \
                      hundreds of years to decompose naturally.",
        tips: "Rinse before recycling. Check local recycling guidelines.",
    },
    GuideEntry {
        name: "Cardboard",
        recyclable: true,
        biodegradable: true,
        description: "Made from paper pulp. Easily recyclable and biodegradable. One of \
                      the most eco-friendly packaging options.",
        tips: "Remove any plastic coating or tape before recycling.",
    },
    GuideEntry {
        name: "Glass",
        recyclable: true,
        biodegradable: false,
        description: "Infinitely recyclable without loss of quality. Heavy and \
                      energy-intensive to transport.",
        tips: "Can be recycled endlessly. Clean and sort by color when possible.",
    },
    GuideEntry {
        name: "Aluminum",
        recyclable: true,
        biodegradable: false,
        description: "Lightweight and highly recyclable. Recycling saves 95% of the \
                      energy needed to produce new aluminum.",
        tips: "Rinse cans and crush to save space. Highly valuable for recycling.",
    },
    GuideEntry {
        name: "Biodegradable Plastics",
        recyclable: false,
        biodegradable: true,
        description: "Made from plant-based materials. Breaks down under specific \
                      conditions but not always in regular composting.",
        tips: "Check if your local facility accepts compostable materials.",
    },
    GuideEntry {
        name: "Styrofoam (EPS)",
        recyclable: false,
        biodegradable: false,
        description: "Lightweight but problematic. Rarely recyclable and takes over 500 \
                      years to decompose.",
        tips: "Try to avoid when possible. Some facilities accept for special recycling.",
    },
];

pub const GENERAL_TIPS: [&str; 6] = [
    "Always rinse containers before recycling to prevent contamination",
    "Remove labels and caps when required by your local facility",
    "Never mix different types of materials in the same recycling bin",
    "Flatten cardboard boxes to save space",
    "Check your local recycling guidelines as they vary by location",
    "When in doubt, choose reusable options over single-use packaging",
];

pub fn guide() -> Guide {
    Guide {
        materials: &MATERIALS,
        general_tips: &GENERAL_TIPS,
    }
}

/// Looks an entry up by name, ignoring case.
pub fn find(name: &str) -> Option<&'static GuideEntry> {
    MATERIALS
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
}
