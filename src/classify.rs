//! Secure File Vault - Classification Engine
//!
//! Maps filenames to the fixed content categories and provides the
//! per-category display tokens used by the presentation layer.

use serde::{Deserialize, Serialize};

/// Content category - closed set.
///
/// `Passwords` is reserved for the password vault section and is never
/// produced by classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Documents,
    Spreadsheets,
    Images,
    Text,
    Passwords,
    Others,
}

const DOCUMENT_EXT: &[&str] = &["pdf", "doc", "docx", "ppt", "pptx"];
const SPREADSHEET_EXT: &[&str] = &["xls", "xlsx", "csv"];
const IMAGE_EXT: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const TEXT_EXT: &[&str] = &["txt", "md", "json"];

impl Category {
    /// All categories, in dashboard display order.
    pub const ALL: [Category; 6] = [
        Category::Documents,
        Category::Spreadsheets,
        Category::Images,
        Category::Text,
        Category::Passwords,
        Category::Others,
    ];

    /// Classify a filename by its extension.
    ///
    /// Total and side-effect-free: an unknown or missing extension
    /// resolves to `Others`, never an error.
    pub fn classify(name: &str) -> Category {
        let extension = match name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
            _ => return Category::Others,
        };

        if DOCUMENT_EXT.contains(&extension.as_str()) {
            Category::Documents
        } else if SPREADSHEET_EXT.contains(&extension.as_str()) {
            Category::Spreadsheets
        } else if IMAGE_EXT.contains(&extension.as_str()) {
            Category::Images
        } else if TEXT_EXT.contains(&extension.as_str()) {
            Category::Text
        } else {
            Category::Others
        }
    }

    /// Section title shown on the dashboard.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Documents => "Documents",
            Category::Spreadsheets => "Spreadsheets",
            Category::Images => "Images",
            Category::Text => "Text Files",
            Category::Passwords => "Password Vault",
            Category::Others => "Others",
        }
    }
}

/// Display token pair for a category card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryStyle {
    /// Material icon name
    pub icon: &'static str,
    /// Accent color (hex)
    pub color: &'static str,
}

/// Fixed lookup from category to display tokens.
///
/// The fallback pair is defensive - the category set is closed, so it
/// should never be observed for a classified item.
pub fn style_for(category: Category) -> CategoryStyle {
    match category {
        Category::Documents => CategoryStyle { icon: "description", color: "#3B82F6" },
        Category::Spreadsheets => CategoryStyle { icon: "table-chart", color: "#10B981" },
        Category::Images => CategoryStyle { icon: "image", color: "#F59E0B" },
        Category::Text => CategoryStyle { icon: "text-snippet", color: "#8B5CF6" },
        Category::Passwords => CategoryStyle { icon: "lock", color: "#EF4444" },
        Category::Others => CategoryStyle { icon: "insert-drive-file", color: "#6B7280" },
    }
}
