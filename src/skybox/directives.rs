//! vtex directive files and the sky materials

use super::faces::Face;
use crate::vmt::Material;

/// Texture transform that stretches a half-height side over the full face
pub const HALF_SIZE_TRANSFORM: &str = "center 0 0 scale 1 2 rotate 0 translate 0 0";

/// Directive for an HDR face compiled from PFM
pub fn hdr_directive(size: u32, compressed: bool) -> String {
    let mut lines = vec!["nolod 1", "nomip 1"];
    if size > 256 {
        lines.push("nonice 1");
    }
    lines.extend(["pfm 1", "pfmscale 1"]);
    if !compressed {
        lines.push("nocompress 1");
    }
    lines.extend(["clamps 1", "clampt 1"]);
    if compressed {
        lines.push("pointsample 1");
    }
    lines.join("\n")
}

/// Directive for an LDR face compiled from TGA
pub fn ldr_directive() -> String {
    ["nolod 1", "clamps 1", "clampt 1", "nomip 1", "nonice 1", "nocompress 1"].join("\n")
}

/// Material path of a face texture, relative to `materials/`
fn texture_path(name: &str, infix: &str, face: Face) -> String {
    format!("skybox/{name}/{name}{infix}{face}")
}

fn transform(face: Face, half_size: bool) -> Option<&'static str> {
    (half_size && face.is_side()).then_some(HALF_SIZE_TRANSFORM)
}

/// `<name>_hdr<face>.vmt`: HDR sky with the LDR texture as fallback
pub fn hdr_material(name: &str, face: Face, compressed: bool, half_size: bool) -> Material {
    let hdr_key = if compressed {
        "hdrcompressedtexture"
    } else {
        "hdrbasetexture"
    };
    Material::new("sky")
        .set("basetexture", texture_path(name, "", face))
        .set(hdr_key, texture_path(name, "_hdr", face))
        .set_opt("basetexturetransform", transform(face, half_size))
}

/// `<name><face>.vmt`: plain LDR sky
pub fn ldr_material(name: &str, face: Face, half_size: bool) -> Material {
    Material::new("UnlitGeneric")
        .set("nofog", 1)
        .set("ignorez", 1)
        .set("basetexture", texture_path(name, "", face))
        .set_opt("basetexturetransform", transform(face, half_size))
}
