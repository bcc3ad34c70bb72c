//! Stamp layout: what text goes where on a letter

/// A single string to draw on the overlay
///
/// Coordinates are PDF user-space points with the origin at the bottom-left
/// of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub bold: bool,
    pub font_size: f32,
}

impl TextItem {
    /// Regular weight text at the given position
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            bold: false,
            font_size,
        }
    }

    /// Same item rendered in the bold font
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// A point on the page in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Placement of the recipient stamp
#[derive(Debug, Clone)]
pub struct StampLayout {
    /// Baseline origin of the recipient name
    pub name_origin: Point,
    /// Name font size in points
    pub name_font_size: f32,
    /// Whether the name uses the bold font
    pub name_bold: bool,
    /// Baseline origin of the department line
    pub department_origin: Point,
    /// Department font size in points
    pub department_font_size: f32,
}

impl Default for StampLayout {
    fn default() -> Self {
        // Top-left corner of an A4 page (595 × 842 pt)
        Self {
            name_origin: Point { x: 50.0, y: 795.0 },
            name_font_size: 16.0,
            name_bold: true,
            department_origin: Point { x: 50.0, y: 778.0 },
            department_font_size: 12.0,
        }
    }
}

impl StampLayout {
    /// Build the text items for one recipient
    ///
    /// The department is printed in parentheses below the name and left out
    /// entirely when absent.
    pub fn items_for(&self, name: &str, department: Option<&str>) -> Vec<TextItem> {
        let mut name_item = TextItem::new(
            name,
            self.name_origin.x,
            self.name_origin.y,
            self.name_font_size,
        );
        name_item.bold = self.name_bold;

        let mut items = vec![name_item];

        if let Some(department) = department.filter(|d| !d.is_empty()) {
            items.push(TextItem::new(
                format!("({})", department),
                self.department_origin.x,
                self.department_origin.y,
                self.department_font_size,
            ));
        }

        items
    }
}
