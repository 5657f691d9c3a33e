//! Presentation model for drilling into one material's properties.

use serde::Serialize;

use crate::material::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Property {
    Chemical,
    Fssai,
    Bis,
    Thickness,
    Gsm,
    Applications,
    Resin,
}

impl Property {
    pub const ALL: [Property; 7] = [
        Property::Chemical,
        Property::Fssai,
        Property::Bis,
        Property::Thickness,
        Property::Gsm,
        Property::Applications,
        Property::Resin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Property::Chemical => "Chemical Structure",
            Property::Fssai => "FSSAI Limits",
            Property::Bis => "BIS Standards",
            Property::Thickness => "Thickness",
            Property::Gsm => "GSM",
            Property::Applications => "Food Applications",
            Property::Resin => "Resin Code",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "chemical" => Some(Property::Chemical),
            "fssai" => Some(Property::Fssai),
            "bis" => Some(Property::Bis),
            "thickness" => Some(Property::Thickness),
            "gsm" => Some(Property::Gsm),
            "applications" => Some(Property::Applications),
            "resin" => Some(Property::Resin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub lines: Vec<String>,
}

/// Properties worth offering for this material.
pub fn available_properties(material: &Material) -> Vec<Property> {
    Property::ALL
        .into_iter()
        .filter(|p| *p != Property::Resin || material.plastic_resin_code.is_some())
        .collect()
}

/// `None` only for the resin panel of a material without a resin code.
pub fn render(material: &Material, property: Property) -> Option<Panel> {
    let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "Not specified".into());

    let (image, lines) = match property {
        Property::Chemical => (
            material.chemical_structure_image.clone(),
            vec![format!("Formula: {}", or_unknown(&material.chemical_formula))],
        ),
        Property::Fssai => (None, material.fssai_limits.clone()),
        Property::Bis => (None, material.bis_limits.clone()),
        Property::Thickness => (
            None,
            vec![format!("Thickness: {}", or_unknown(&material.thickness))],
        ),
        Property::Gsm => (None, vec![format!("GSM: {}", or_unknown(&material.gsm))]),
        Property::Applications => (None, material.food_applications.clone()),
        Property::Resin => {
            let code = material.plastic_resin_code?;
            let mut lines = vec![format!("Resin code: #{code}")];
            if let Some(layers) = &material.layer_composition {
                lines.push(format!("Layers: {layers}"));
            }
            (None, lines)
        }
    };

    Some(Panel {
        title: format!("{} - {}", material.kind, property.label()),
        image,
        lines,
    })
}

/// Header shown when a material is selected, before a property is picked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSummary {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustainability_rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustainability_tier: Option<SustainabilityTier>,
    pub properties: Vec<Property>,
}

pub fn summarize(material: &Material) -> MaterialSummary {
    MaterialSummary {
        kind: material.kind.clone(),
        classification: material.classification.clone(),
        sustainability_rating: material.sustainability_rating,
        sustainability_tier: material.sustainability_rating.map(sustainability_tier),
        properties: available_properties(material),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SustainabilityTier {
    Good,
    Fair,
    Poor,
}

pub fn sustainability_tier(rating: u8) -> SustainabilityTier {
    match rating {
        4..=u8::MAX => SustainabilityTier::Good,
        3 => SustainabilityTier::Fair,
        _ => SustainabilityTier::Poor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resin_panel_only_for_coded_materials() {
        let film = Material::new("LDPE film");
        let mut bottle = Material::new("PET bottle");
        bottle.plastic_resin_code = Some(1);

        assert!(!available_properties(&film).contains(&Property::Resin));
        assert!(render(&film, Property::Resin).is_none());

        assert!(available_properties(&bottle).contains(&Property::Resin));
        let panel = render(&bottle, Property::Resin).unwrap();
        assert_eq!(panel.title, "PET bottle - Resin Code");
        assert_eq!(panel.lines, vec!["Resin code: #1"]);
    }

    #[test]
    fn chemical_panel_carries_image_and_formula() {
        let mut m = Material::new("Aluminum foil").with_formula("Al");
        m.chemical_structure_image = Some("data:image/png;base64,AA".into());

        let panel = render(&m, Property::Chemical).unwrap();
        assert_eq!(panel.image.as_deref(), Some("data:image/png;base64,AA"));
        assert_eq!(panel.lines, vec!["Formula: Al"]);
    }

    #[test]
    fn list_panels_use_normalized_fields() {
        let m: Material = serde_json::from_value(serde_json::json!({
            "type": "Kraft paper",
            "foodApplications": "Bakery",
        }))
        .unwrap();
        let panel = render(&m, Property::Applications).unwrap();
        assert_eq!(panel.lines, vec!["Bakery"]);
    }

    #[test]
    fn property_ids_round_trip_through_labels() {
        for p in Property::ALL {
            let id = serde_json::to_value(p).unwrap();
            assert_eq!(Property::parse(id.as_str().unwrap()), Some(p));
        }
        assert_eq!(Property::parse("colour"), None);
    }

    #[test]
    fn summary_lists_properties_and_tier() {
        let mut m = Material::new("Glass jar");
        m.sustainability_rating = Some(4);
        let summary = summarize(&m);
        assert_eq!(summary.sustainability_tier, Some(SustainabilityTier::Good));
        assert_eq!(summary.properties.len(), 6);
    }

    #[test]
    fn tiers() {
        assert_eq!(sustainability_tier(5), SustainabilityTier::Good);
        assert_eq!(sustainability_tier(3), SustainabilityTier::Fair);
        assert_eq!(sustainability_tier(1), SustainabilityTier::Poor);
    }
}
