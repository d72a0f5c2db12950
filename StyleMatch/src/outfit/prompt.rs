//! Instruction text sent alongside the atlas

/// Build the generation instruction for an atlas of `count` garments
///
/// The template is fixed; only the count (and the plural it drives) varies.
pub fn build_prompt(count: usize) -> String {
    let noun = if count == 1 { "garment" } else { "garments" };
    [
        "Use the base image (the garment atlas) as the only reference.".to_string(),
        "Generate a photorealistic full-body photo of a matte white plastic mannequin without facial features, on a neutral background with studio lighting.".to_string(),
        format!(
            "Exactly {} {} taken from the atlas must appear, without adding, completing or inventing any other garments, accessories, logos or text.",
            count, noun
        ),
        "Each garment must keep exactly its colour, material, texture and pattern, without copying or moving logos or prints from one garment to another.".to_string(),
        "Duplicating, mirroring, projecting or merging logos, patches, crests, text, graphics or patterns from one garment onto another is strictly forbidden.".to_string(),
        "When there are several garments, layer them opaquely and realistically: the outer garment covers the inner one where it should; no transparency.".to_string(),
        "Any detail of an inner garment that is covered by an outer one must not be visible.".to_string(),
        "Where a body area has no garment in the atlas, show the white mannequin material in that area.".to_string(),
        "Do not move or invent logos, patches, crests, typography, symbols or graphics on garments that do not have them in the atlas.".to_string(),
        "Do not mix textures between layers. No ghost prints, no blurred edges, no transparency between garments.".to_string(),
        "When in doubt about whether a garment or detail exists or is visible, do NOT generate it.".to_string(),
        "If an element of the image is marked as not visible or lies underneath another garment, DO NOT SHOW IT.".to_string(),
    ]
    .join(" ")
}
