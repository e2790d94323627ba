//! Field types and field flags according to ISO 32000-1 Section 12.7.3

use bitflags::bitflags;

/// Field type (`/FT`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Button field (push button, checkbox, radio button)
    Button,
    Text,
    /// Choice field (list box, combo box)
    Choice,
    Signature,
}

impl FieldType {
    /// Get the PDF field type name
    pub fn pdf_name(&self) -> &'static str {
        match self {
            FieldType::Button => "Btn",
            FieldType::Text => "Tx",
            FieldType::Choice => "Ch",
            FieldType::Signature => "Sig",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Btn" => Some(FieldType::Button),
            "Tx" => Some(FieldType::Text),
            "Ch" => Some(FieldType::Choice),
            "Sig" => Some(FieldType::Signature),
            _ => None,
        }
    }
}

bitflags! {
    /// Field flags (`/Ff`). Bits 1-3 are common to all field types, the
    /// rest only mean something for the field type noted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u32 {
        const READ_ONLY = 1 << 0;
        const REQUIRED = 1 << 1;
        const NO_EXPORT = 1 << 2;

        /// Tx: text may span multiple lines
        const MULTILINE = 1 << 12;
        /// Tx
        const PASSWORD = 1 << 13;
        /// Btn: at least one radio button must stay on
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Btn
        const RADIO = 1 << 15;
        /// Btn
        const PUSHBUTTON = 1 << 16;
        /// Ch: combo box instead of list box
        const COMBO = 1 << 17;
        /// Ch
        const EDIT = 1 << 18;
        /// Ch
        const SORT = 1 << 19;
        /// Tx
        const FILE_SELECT = 1 << 20;
        /// Ch
        const MULTI_SELECT = 1 << 21;
        /// Tx and Ch
        const DO_NOT_SPELL_CHECK = 1 << 22;
        /// Tx
        const DO_NOT_SCROLL = 1 << 23;
        /// Tx
        const COMB = 1 << 24;
        /// Tx: rich text; Btn: radios in unison
        const RICH_TEXT = 1 << 25;
        /// Ch
        const COMMIT_ON_SEL_CHANGE = 1 << 26;
    }
}

impl FieldFlags {
    /// Whether a button field with these flags is a checkbox.
    pub fn is_checkbox(&self) -> bool {
        !self.intersects(FieldFlags::RADIO | FieldFlags::PUSHBUTTON)
    }
}
