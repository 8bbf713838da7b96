//! Report identity derived from agency.txt.

use crate::feed::AgencyRow;

/// Fallback when agency.txt names nobody.
const UNNAMED: &str = "schedule";

/// Title and file naming for a feed's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedIdentity {
    /// Human-facing title: the agency name, else its id
    pub title: String,
    /// Output file stem: the agency id, else its name
    pub output_stem: String,
    /// Agency recorded for routes that name none: the name, else the id
    pub agency: String,
}

impl FeedIdentity {
    /// Derives the identity from the first agency row.
    ///
    /// Blank values count as absent. `title` overrides the derived title.
    ///
    /// # Examples
    ///
    /// ```
    /// use ttime::assembler::FeedIdentity;
    /// use ttime::feed::AgencyRow;
    ///
    /// let rows = [AgencyRow {
    ///     agency_id: Some("MBTA".into()),
    ///     agency_name: "Massachusetts Bay Transportation Authority".into(),
    /// }];
    /// let identity = FeedIdentity::from_agencies(&rows, None);
    ///
    /// assert_eq!(identity.title, "Massachusetts Bay Transportation Authority");
    /// assert_eq!(identity.output_file_name(), "MBTA.json");
    /// ```
    pub fn from_agencies(rows: &[AgencyRow], title: Option<String>) -> Self {
        let first = rows.first();
        let id = first
            .and_then(|row| row.agency_id.as_deref())
            .filter(|id| !id.is_empty());
        let name = first
            .map(|row| row.agency_name.as_str())
            .filter(|name| !name.is_empty());

        let agency = name.or(id).unwrap_or(UNNAMED).to_string();
        let title = title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| agency.clone());
        let output_stem = id.or(name).unwrap_or(UNNAMED).to_string();

        Self {
            title,
            output_stem,
            agency,
        }
    }

    /// Default report file name.
    pub fn output_file_name(&self) -> String {
        format!("{}.json", self.output_stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agency(id: Option<&str>, name: &str) -> AgencyRow {
        AgencyRow {
            agency_id: id.map(str::to_string),
            agency_name: name.to_string(),
        }
    }

    #[test]
    fn prefers_name_for_title_and_id_for_file() {
        let identity = FeedIdentity::from_agencies(&[agency(Some("CT"), "CT Transit")], None);

        assert_eq!(identity.title, "CT Transit");
        assert_eq!(identity.output_stem, "CT");
    }

    #[test]
    fn missing_id_falls_back_to_name() {
        let identity = FeedIdentity::from_agencies(&[agency(None, "CT Transit")], None);

        assert_eq!(identity.output_file_name(), "CT Transit.json");
    }

    #[test]
    fn blank_name_falls_back_to_id() {
        let identity = FeedIdentity::from_agencies(&[agency(Some("CT"), "")], None);

        assert_eq!(identity.title, "CT");
        assert_eq!(identity.agency, "CT");
    }

    #[test]
    fn first_agency_wins() {
        let rows = [agency(Some("A"), "Alpha"), agency(Some("B"), "Beta")];

        let identity = FeedIdentity::from_agencies(&rows, None);

        assert_eq!(identity.title, "Alpha");
        assert_eq!(identity.output_stem, "A");
    }

    #[test]
    fn configured_title_overrides() {
        let identity = FeedIdentity::from_agencies(
            &[agency(Some("CT"), "CT Transit")],
            Some("Hartford buses".into()),
        );

        assert_eq!(identity.title, "Hartford buses");
        assert_eq!(identity.agency, "CT Transit");
        assert_eq!(identity.output_stem, "CT");
    }

    #[test]
    fn empty_agency_table() {
        let identity = FeedIdentity::from_agencies(&[], None);

        assert_eq!(identity.title, "schedule");
        assert_eq!(identity.output_file_name(), "schedule.json");
    }
}
