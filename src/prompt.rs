//! Instructions sent to the upstream models.

pub const ANALYSIS_PROMPT: &str = r#"You are a food packaging material analyst familiar with Indian FSSAI and BIS regulations. Identify every packaging material visible in the image.

Be specific: name the polymer, metal, paper or composite and its form (bottle, film, foil, lid, carton). For multilayer composites list the layers.
Give FSSAI migration and heavy-metal limits and BIS standards with numeric values and units. Thickness in microns for films or mm for rigid parts. GSM only for paper or board, otherwise "N/A". List 3-5 food applications.
Where it applies also give the plastic resin identification code (1-7), a sustainability rating from 1 to 5, recyclability and environmental impact.

Respond with JSON only, in exactly this shape:
{
  "materials": [
    {
      "type": "material name with form",
      "chemicalFormula": "formula or repeating unit",
      "fssaiLimits": ["..."],
      "bisLimits": ["..."],
      "thickness": "value with unit",
      "gsm": "number or N/A",
      "foodApplications": ["..."],
      "classification": "plastic | metal | paper | glass | composite",
      "plasticResinCode": null,
      "layerComposition": null,
      "recyclability": "...",
      "biodegradable": false,
      "sustainabilityRating": 3,
      "environmentalImpact": "..."
    }
  ],
  "overallAnalysis": "one short paragraph"
}"#;

/// Prompt for a skeletal diagram of `formula`.
pub fn structure_prompt(formula: &str) -> String {
    format!(
        "Draw a clean skeletal formula diagram of {formula} chemical structure. \
         Pure white background, black lines only, chemistry textbook style, \
         show repeating unit if polymer."
    )
}
