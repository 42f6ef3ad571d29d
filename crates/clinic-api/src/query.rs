//! Query parameters for the paginated list endpoints.
//!
//! Each query turns into a list of `(key, value)` pairs. Unset and empty
//! values are left out entirely: the backend treats `?sortBy=` differently
//! from no `sortBy` at all.

/// Sort order accepted by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Paging and sorting shared by every list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: u32,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort_by: None,
            sort_direction: None,
        }
    }
}

impl PageQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "page", Some(self.page.to_string()));
        push(&mut pairs, "sortBy", self.sort_by.clone());
        push(
            &mut pairs,
            "sortDirection",
            self.sort_direction.map(|d| d.as_str().to_string()),
        );
        pairs
    }
}

/// `GET /client`
pub type PatientQuery = PageQuery;

/// `GET /reminder`
pub type AppointmentQuery = PageQuery;

/// `GET /recording`, optionally narrowed to one patient, one appointment,
/// or one kind of recording.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingQuery {
    pub page: PageQuery,
    pub client_id: Option<String>,
    pub reminder_id: Option<String>,
    pub kind: Option<crate::RecordingKind>,
}

impl RecordingQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self.page.to_pairs();
        push(&mut pairs, "clientId", self.client_id.clone());
        push(&mut pairs, "reminderId", self.reminder_id.clone());
        push(&mut pairs, "type", self.kind.map(|k| k.as_str().to_string()));
        pairs
    }
}

fn push(
    pairs: &mut Vec<(&'static str, String)>,
    key: &'static str,
    value: Option<String>,
) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        pairs.push((key, value));
    }
}
