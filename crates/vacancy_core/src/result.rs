/// Outcome of one monitoring pass over the source page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VacancyResult {
    pub titles: Vec<String>,
    pub count: u64,
}

impl VacancyResult {
    /// Combine extracted titles with the page's self-reported total.
    ///
    /// The reported total wins when present; otherwise the titles are counted.
    pub fn new(titles: Vec<String>, reported_count: Option<u64>) -> Self {
        let count = reported_count.unwrap_or(titles.len() as u64);
        Self { titles, count }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
