// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Keyword dispatch
//!
//! Maps keyword names onto the closed set of kinds the model builder
//! understands. Everything else is [`KeywordKind::Unrecognized`] and passes
//! through untouched.

use std::fmt;

/// Section keyword variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SectionKind {
    Shell,
    Beam,
    Solid,
    Discrete,
}

/// Standard element keyword variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    Shell,
    Solid,
    Beam,
    Tshell,
    Discrete,
}

/// Recognized keyword kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeywordKind {
    /// `*KEYWORD` deck-open marker
    DeckOpen,
    /// `*END` deck-close marker
    DeckClose,
    Part,
    Section(SectionKind),
    Material,
    Node,
    Element(ElementKind),
    MassElement,
    /// Anything else; carries the raw keyword name
    Unrecognized(String),
}

/// Part keyword options that keep the standard PID/SECID/MID card
const PART_OPTIONS: &[&str] = &["INERTIA", "CONTACT", "PRINT", "ANISOTROPIC", "AVERAGED"];

/// Material keywords whose first field is not a material definition id
const MATERIAL_EXCLUSIONS: &[&str] = &["*MAT_ADD_", "*MAT_THERMAL_"];

impl KeywordKind {
    /// Classify an uppercase keyword name (e.g. `"*SECTION_SHELL_TITLE"`)
    pub fn classify(keyword: &str) -> Self {
        let kind = match keyword {
            "*KEYWORD" => Some(Self::DeckOpen),
            "*END" => Some(Self::DeckClose),
            "*NODE" => Some(Self::Node),
            "*ELEMENT_SHELL" => Some(Self::Element(ElementKind::Shell)),
            "*ELEMENT_SOLID" => Some(Self::Element(ElementKind::Solid)),
            "*ELEMENT_BEAM" => Some(Self::Element(ElementKind::Beam)),
            "*ELEMENT_TSHELL" => Some(Self::Element(ElementKind::Tshell)),
            "*ELEMENT_DISCRETE" => Some(Self::Element(ElementKind::Discrete)),
            "*ELEMENT_MASS" => Some(Self::MassElement),
            _ => None,
        };
        if let Some(kind) = kind {
            return kind;
        }

        if let Some(options) = keyword.strip_prefix("*PART") {
            let standard = options.is_empty()
                || options
                    .strip_prefix('_')
                    .is_some_and(|opts| opts.split('_').all(|o| PART_OPTIONS.contains(&o)));
            if standard {
                return Self::Part;
            }
        }

        if let Some(rest) = keyword.strip_prefix("*SECTION_") {
            let section = [
                ("SHELL", SectionKind::Shell),
                ("BEAM", SectionKind::Beam),
                ("SOLID", SectionKind::Solid),
                ("DISCRETE", SectionKind::Discrete),
            ]
            .into_iter()
            .find(|(name, _)| rest.starts_with(name));
            if let Some((_, kind)) = section {
                return Self::Section(kind);
            }
        }

        if keyword.starts_with("*MAT_")
            && !MATERIAL_EXCLUSIONS.iter().any(|p| keyword.starts_with(p))
        {
            return Self::Material;
        }

        Self::Unrecognized(keyword.to_string())
    }

    /// True for the `*KEYWORD` / `*END` markers
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::DeckOpen | Self::DeckClose)
    }

    /// Short label for logs and reports
    pub fn label(&self) -> &str {
        match self {
            Self::DeckOpen => "deck-open",
            Self::DeckClose => "deck-close",
            Self::Part => "part",
            Self::Section(_) => "section",
            Self::Material => "material",
            Self::Node => "node",
            Self::Element(_) => "element",
            Self::MassElement => "mass-element",
            Self::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sentinels() {
        assert_eq!(KeywordKind::classify("*KEYWORD"), KeywordKind::DeckOpen);
        assert_eq!(KeywordKind::classify("*END"), KeywordKind::DeckClose);
        assert!(KeywordKind::DeckOpen.is_sentinel());
    }

    #[test]
    fn test_classify_part_options() {
        assert_eq!(KeywordKind::classify("*PART"), KeywordKind::Part);
        assert_eq!(KeywordKind::classify("*PART_INERTIA"), KeywordKind::Part);
        assert_eq!(KeywordKind::classify("*PART_CONTACT_PRINT"), KeywordKind::Part);
        assert!(matches!(
            KeywordKind::classify("*PART_COMPOSITE"),
            KeywordKind::Unrecognized(_)
        ));
        assert!(matches!(
            KeywordKind::classify("*PARTSET"),
            KeywordKind::Unrecognized(_)
        ));
    }

    #[test]
    fn test_classify_sections() {
        assert_eq!(
            KeywordKind::classify("*SECTION_SHELL"),
            KeywordKind::Section(SectionKind::Shell)
        );
        assert_eq!(
            KeywordKind::classify("*SECTION_BEAM_TITLE"),
            KeywordKind::Section(SectionKind::Beam)
        );
        assert!(matches!(
            KeywordKind::classify("*SECTION_SPH"),
            KeywordKind::Unrecognized(_)
        ));
    }

    #[test]
    fn test_classify_elements() {
        assert_eq!(
            KeywordKind::classify("*ELEMENT_TSHELL"),
            KeywordKind::Element(ElementKind::Tshell)
        );
        assert_eq!(KeywordKind::classify("*ELEMENT_MASS"), KeywordKind::MassElement);
        assert!(matches!(
            KeywordKind::classify("*ELEMENT_SHELL_THICKNESS"),
            KeywordKind::Unrecognized(_)
        ));
        assert_eq!(KeywordKind::classify("*NODE"), KeywordKind::Node);
    }

    #[test]
    fn test_classify_materials() {
        assert_eq!(KeywordKind::classify("*MAT_ELASTIC"), KeywordKind::Material);
        assert_eq!(
            KeywordKind::classify("*MAT_PIECEWISE_LINEAR_PLASTICITY_TITLE"),
            KeywordKind::Material
        );
        assert!(matches!(
            KeywordKind::classify("*MAT_ADD_EROSION"),
            KeywordKind::Unrecognized(_)
        ));
    }

    #[test]
    fn test_unrecognized_carries_name() {
        match KeywordKind::classify("*CONTROL_TERMINATION") {
            KeywordKind::Unrecognized(name) => assert_eq!(name, "*CONTROL_TERMINATION"),
            other => panic!("Expected Unrecognized, got {:?}", other),
        }
        assert!(matches!(
            KeywordKind::classify("*DATABASE_BINARY_D3PLOT"),
            KeywordKind::Unrecognized(_)
        ));
    }
}
