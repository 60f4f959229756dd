/// Fixed, versioned list of diagnostic class names, index-aligned with the
/// classifier's output vector.
///
/// The severity policy is written against these exact names and must be
/// revalidated whenever the class set changes.
#[derive(Debug, Clone)]
pub struct ClassList {
    names: Vec<String>,
}

impl ClassList {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for ClassList {
    fn default() -> Self {
        Self::new(vec![
            "No finding".to_string(),
            "Pneumonia".to_string(),
            "Other disease".to_string(),
        ])
    }
}
