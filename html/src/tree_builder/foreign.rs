// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tag and attribute fixups for MathML and SVG content. HTML
//! tokenization lowercases names; these tables restore the mixed-case
//! spellings and namespaced attributes the foreign vocabularies use.

use crate::tokenizer::Tag;
use crate::{Attribute, LocalName, QualName};
use shrike_markup::{local_name, namespace_prefix, namespace_url, ns};

macro_rules! qual {
    ("", $local:tt) => {
        QualName {
            prefix: None,
            ns: ns!(),
            local: local_name!($local),
        }
    };
    ($prefix:tt $ns:tt $local:tt) => {
        QualName {
            prefix: Some(namespace_prefix!($prefix)),
            ns: ns!($ns),
            local: local_name!($local),
        }
    };
}

fn map_attributes<F>(tag: &mut Tag, mut map: F)
where
    F: FnMut(LocalName) -> Option<QualName>,
{
    for &mut Attribute { ref mut name, .. } in &mut tag.attrs {
        if let Some(replacement) = map(name.local.clone()) {
            *name = replacement;
        }
    }
}

/// <https://html.spec.whatwg.org/multipage/parsing.html#adjust-svg-attributes>
pub(crate) fn adjust_svg_attributes(tag: &mut Tag) {
    map_attributes(tag, |k| match k {
        local_name!("attributename") => Some(qual!("", "attributeName")),
        local_name!("attributetype") => Some(qual!("", "attributeType")),
        local_name!("basefrequency") => Some(qual!("", "baseFrequency")),
        local_name!("baseprofile") => Some(qual!("", "baseProfile")),
        local_name!("calcmode") => Some(qual!("", "calcMode")),
        local_name!("clippathunits") => Some(qual!("", "clipPathUnits")),
        local_name!("diffuseconstant") => Some(qual!("", "diffuseConstant")),
        local_name!("edgemode") => Some(qual!("", "edgeMode")),
        local_name!("filterunits") => Some(qual!("", "filterUnits")),
        local_name!("glyphref") => Some(qual!("", "glyphRef")),
        local_name!("gradienttransform") => Some(qual!("", "gradientTransform")),
        local_name!("gradientunits") => Some(qual!("", "gradientUnits")),
        local_name!("kernelmatrix") => Some(qual!("", "kernelMatrix")),
        local_name!("kernelunitlength") => Some(qual!("", "kernelUnitLength")),
        local_name!("keypoints") => Some(qual!("", "keyPoints")),
        local_name!("keysplines") => Some(qual!("", "keySplines")),
        local_name!("keytimes") => Some(qual!("", "keyTimes")),
        local_name!("lengthadjust") => Some(qual!("", "lengthAdjust")),
        local_name!("limitingconeangle") => Some(qual!("", "limitingConeAngle")),
        local_name!("markerheight") => Some(qual!("", "markerHeight")),
        local_name!("markerunits") => Some(qual!("", "markerUnits")),
        local_name!("markerwidth") => Some(qual!("", "markerWidth")),
        local_name!("maskcontentunits") => Some(qual!("", "maskContentUnits")),
        local_name!("maskunits") => Some(qual!("", "maskUnits")),
        local_name!("numoctaves") => Some(qual!("", "numOctaves")),
        local_name!("pathlength") => Some(qual!("", "pathLength")),
        local_name!("patterncontentunits") => Some(qual!("", "patternContentUnits")),
        local_name!("patterntransform") => Some(qual!("", "patternTransform")),
        local_name!("patternunits") => Some(qual!("", "patternUnits")),
        local_name!("pointsatx") => Some(qual!("", "pointsAtX")),
        local_name!("pointsaty") => Some(qual!("", "pointsAtY")),
        local_name!("pointsatz") => Some(qual!("", "pointsAtZ")),
        local_name!("preservealpha") => Some(qual!("", "preserveAlpha")),
        local_name!("preserveaspectratio") => Some(qual!("", "preserveAspectRatio")),
        local_name!("primitiveunits") => Some(qual!("", "primitiveUnits")),
        local_name!("refx") => Some(qual!("", "refX")),
        local_name!("refy") => Some(qual!("", "refY")),
        local_name!("repeatcount") => Some(qual!("", "repeatCount")),
        local_name!("repeatdur") => Some(qual!("", "repeatDur")),
        local_name!("requiredextensions") => Some(qual!("", "requiredExtensions")),
        local_name!("requiredfeatures") => Some(qual!("", "requiredFeatures")),
        local_name!("specularconstant") => Some(qual!("", "specularConstant")),
        local_name!("specularexponent") => Some(qual!("", "specularExponent")),
        local_name!("spreadmethod") => Some(qual!("", "spreadMethod")),
        local_name!("startoffset") => Some(qual!("", "startOffset")),
        local_name!("stddeviation") => Some(qual!("", "stdDeviation")),
        local_name!("stitchtiles") => Some(qual!("", "stitchTiles")),
        local_name!("surfacescale") => Some(qual!("", "surfaceScale")),
        local_name!("systemlanguage") => Some(qual!("", "systemLanguage")),
        local_name!("tablevalues") => Some(qual!("", "tableValues")),
        local_name!("targetx") => Some(qual!("", "targetX")),
        local_name!("targety") => Some(qual!("", "targetY")),
        local_name!("textlength") => Some(qual!("", "textLength")),
        local_name!("viewbox") => Some(qual!("", "viewBox")),
        local_name!("viewtarget") => Some(qual!("", "viewTarget")),
        local_name!("xchannelselector") => Some(qual!("", "xChannelSelector")),
        local_name!("ychannelselector") => Some(qual!("", "yChannelSelector")),
        local_name!("zoomandpan") => Some(qual!("", "zoomAndPan")),
        _ => None,
    });
}

/// <https://html.spec.whatwg.org/multipage/parsing.html#adjust-mathml-attributes>
pub(crate) fn adjust_mathml_attributes(tag: &mut Tag) {
    map_attributes(tag, |k| match k {
        local_name!("definitionurl") => Some(qual!("", "definitionURL")),
        _ => None,
    });
}

/// <https://html.spec.whatwg.org/multipage/parsing.html#adjust-foreign-attributes>
pub(crate) fn adjust_foreign_attributes(tag: &mut Tag) {
    map_attributes(tag, |k| match k {
        local_name!("xlink:actuate") => Some(qual!("xlink" xlink "actuate")),
        local_name!("xlink:arcrole") => Some(qual!("xlink" xlink "arcrole")),
        local_name!("xlink:href") => Some(qual!("xlink" xlink "href")),
        local_name!("xlink:role") => Some(qual!("xlink" xlink "role")),
        local_name!("xlink:show") => Some(qual!("xlink" xlink "show")),
        local_name!("xlink:title") => Some(qual!("xlink" xlink "title")),
        local_name!("xlink:type") => Some(qual!("xlink" xlink "type")),
        local_name!("xml:lang") => Some(qual!("xml" xml "lang")),
        local_name!("xml:space") => Some(qual!("xml" xml "space")),
        local_name!("xmlns") => Some(qual!("" xmlns "xmlns")),
        local_name!("xmlns:xlink") => Some(qual!("xmlns" xmlns "xlink")),
        _ => None,
    });
}

/// Restore the mixed-case SVG element names,
/// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inforeign>.
pub(crate) fn adjust_svg_tag_name(tag: &mut Tag) {
    let replacement = match tag.name {
        local_name!("altglyph") => local_name!("altGlyph"),
        local_name!("altglyphdef") => local_name!("altGlyphDef"),
        local_name!("altglyphitem") => local_name!("altGlyphItem"),
        local_name!("animatecolor") => local_name!("animateColor"),
        local_name!("animatemotion") => local_name!("animateMotion"),
        local_name!("animatetransform") => local_name!("animateTransform"),
        local_name!("clippath") => local_name!("clipPath"),
        local_name!("feblend") => local_name!("feBlend"),
        local_name!("fecolormatrix") => local_name!("feColorMatrix"),
        local_name!("fecomponenttransfer") => local_name!("feComponentTransfer"),
        local_name!("fecomposite") => local_name!("feComposite"),
        local_name!("feconvolvematrix") => local_name!("feConvolveMatrix"),
        local_name!("fediffuselighting") => local_name!("feDiffuseLighting"),
        local_name!("fedisplacementmap") => local_name!("feDisplacementMap"),
        local_name!("fedistantlight") => local_name!("feDistantLight"),
        local_name!("fedropshadow") => local_name!("feDropShadow"),
        local_name!("feflood") => local_name!("feFlood"),
        local_name!("fefunca") => local_name!("feFuncA"),
        local_name!("fefuncb") => local_name!("feFuncB"),
        local_name!("fefuncg") => local_name!("feFuncG"),
        local_name!("fefuncr") => local_name!("feFuncR"),
        local_name!("fegaussianblur") => local_name!("feGaussianBlur"),
        local_name!("feimage") => local_name!("feImage"),
        local_name!("femerge") => local_name!("feMerge"),
        local_name!("femergenode") => local_name!("feMergeNode"),
        local_name!("femorphology") => local_name!("feMorphology"),
        local_name!("feoffset") => local_name!("feOffset"),
        local_name!("fepointlight") => local_name!("fePointLight"),
        local_name!("fespecularlighting") => local_name!("feSpecularLighting"),
        local_name!("fespotlight") => local_name!("feSpotLight"),
        local_name!("fetile") => local_name!("feTile"),
        local_name!("feturbulence") => local_name!("feTurbulence"),
        local_name!("foreignobject") => local_name!("foreignObject"),
        local_name!("glyphref") => local_name!("glyphRef"),
        local_name!("lineargradient") => local_name!("linearGradient"),
        local_name!("radialgradient") => local_name!("radialGradient"),
        local_name!("textpath") => local_name!("textPath"),
        _ => return,
    };
    tag.name = replacement;
}
