//! Reading tables from a feed directory or zip archive.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::FeedError;

/// The tables a feed is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Agency,
    Routes,
    Trips,
    StopTimes,
    Stops,
    Calendar,
    CalendarDates,
}

impl Table {
    /// Every table, in the order a report run reads them.
    pub const ALL: [Table; 7] = [
        Table::Agency,
        Table::Routes,
        Table::Trips,
        Table::StopTimes,
        Table::Stops,
        Table::Calendar,
        Table::CalendarDates,
    ];

    /// File name of the table within the feed.
    pub fn file_name(self) -> &'static str {
        match self {
            Table::Agency => "agency.txt",
            Table::Routes => "routes.txt",
            Table::Trips => "trips.txt",
            Table::StopTimes => "stop_times.txt",
            Table::Stops => "stops.txt",
            Table::Calendar => "calendar.txt",
            Table::CalendarDates => "calendar_dates.txt",
        }
    }

    /// Only the calendar exceptions may be left out of a feed.
    pub fn is_required(self) -> bool {
        !matches!(self, Table::CalendarDates)
    }
}

/// Where a feed's tables live.
///
/// Each read opens the underlying file, consumes the table completely and
/// releases it again; nothing is cached between reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Tables as loose files in a directory
    Directory(PathBuf),
    /// Tables packed in a zip archive, possibly under a sub-folder
    Archive(PathBuf),
}

impl FeedSource {
    /// Opens a feed from a zip archive or a directory path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        if path.is_file() {
            Ok(FeedSource::Archive(path.to_path_buf()))
        } else if path.is_dir() {
            Ok(FeedSource::Directory(path.to_path_buf()))
        } else {
            Err(FeedError::NotFileNorDirectory(path.display().to_string()))
        }
    }

    /// Streams every row of a table into `f`, returning the row count.
    ///
    /// Rows are deserialized one at a time, so callers can discard
    /// uninteresting rows without holding the whole table in memory.
    pub fn for_each_row<R, F>(&self, table: Table, mut f: F) -> Result<usize, FeedError>
    where
        R: DeserializeOwned,
        F: FnMut(R),
    {
        let file = table.file_name();
        let count = self.with_table(table, |reader| read_rows(reader, file, &mut f))?;
        debug!(file, rows = count, "read table");
        Ok(count)
    }

    /// Reads every row of a table.
    pub fn read_table<R: DeserializeOwned>(&self, table: Table) -> Result<Vec<R>, FeedError> {
        let mut rows = Vec::new();
        self.for_each_row(table, |row| rows.push(row))?;
        Ok(rows)
    }

    /// Reads a table that may be absent, returning `None` when it is.
    pub fn read_optional_table<R: DeserializeOwned>(
        &self,
        table: Table,
    ) -> Result<Option<Vec<R>>, FeedError> {
        match self.read_table(table) {
            Ok(rows) => Ok(Some(rows)),
            Err(FeedError::MissingRequiredFile { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn with_table<T>(
        &self,
        table: Table,
        f: impl FnOnce(&mut dyn Read) -> Result<T, FeedError>,
    ) -> Result<T, FeedError> {
        let file_name = table.file_name();
        match self {
            FeedSource::Directory(dir) => {
                let path = dir.join(file_name);
                if !path.exists() {
                    return Err(FeedError::MissingRequiredFile {
                        file: file_name.to_string(),
                    });
                }
                let mut file =
                    File::open(&path).map_err(|e| FeedError::unreadable(file_name, e))?;
                f(&mut file)
            }
            FeedSource::Archive(path) => {
                let archive_name = path.display().to_string();
                let file = File::open(path).map_err(|e| FeedError::unreadable(&archive_name, e))?;
                let mut archive = zip::ZipArchive::new(BufReader::new(file))
                    .map_err(|e| FeedError::unreadable(&archive_name, e))?;

                // Tables may sit in a folder inside the archive.
                let entry_name = archive
                    .file_names()
                    .find(|name| Path::new(name).file_name() == Some(OsStr::new(file_name)))
                    .map(str::to_string)
                    .ok_or_else(|| FeedError::MissingRequiredFile {
                        file: file_name.to_string(),
                    })?;

                let mut entry = archive
                    .by_name(&entry_name)
                    .map_err(|e| FeedError::unreadable(file_name, e))?;
                f(&mut entry)
            }
        }
    }
}

/// Deserializes header-indexed rows, tolerating a UTF-8 byte order mark.
fn read_rows<R, F>(reader: &mut dyn Read, file: &str, f: &mut F) -> Result<usize, FeedError>
where
    R: DeserializeOwned,
    F: FnMut(R),
{
    let mut reader = BufReader::new(reader);
    let has_bom = reader
        .fill_buf()
        .map_err(|e| FeedError::unreadable(file, e))?
        .starts_with(&[0xef, 0xbb, 0xbf]);
    if has_bom {
        reader.consume(3);
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut count = 0;
    for row in csv_reader.deserialize::<R>() {
        let row = row.map_err(|e| FeedError::unreadable(file, e))?;
        f(row);
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{AgencyRow, CalendarDateRow, FeedErrorKind, StopRow};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone\n\
                          MBTA,MBTA,https://www.mbta.com,America/New_York\n";
    const STOPS: &str = "stop_id,stop_name\nA,Alewife Station\nD,Davis\n";

    fn write_dir(files: &[(&str, &[u8])]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    fn write_zip(files: &[(&str, &[u8])]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut zip = zip::ZipWriter::new(file.reopen().unwrap());
        for (name, contents) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
        file
    }

    #[test]
    fn open_classifies_path() {
        let dir = write_dir(&[]);
        assert_eq!(
            FeedSource::open(dir.path()).unwrap(),
            FeedSource::Directory(dir.path().to_path_buf())
        );

        let zip = write_zip(&[("agency.txt", AGENCY.as_bytes())]);
        assert_eq!(
            FeedSource::open(zip.path()).unwrap(),
            FeedSource::Archive(zip.path().to_path_buf())
        );

        let missing = dir.path().join("nope");
        assert!(matches!(
            FeedSource::open(&missing),
            Err(FeedError::NotFileNorDirectory(_))
        ));
    }

    #[test]
    fn reads_from_directory() {
        let dir = write_dir(&[("agency.txt", AGENCY.as_bytes())]);
        let source = FeedSource::open(dir.path()).unwrap();

        let rows: Vec<AgencyRow> = source.read_table(Table::Agency).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].agency_id.as_deref(), Some("MBTA"));
    }

    #[test]
    fn reads_from_archive_and_nested_folder() {
        let zip = write_zip(&[
            ("feed/agency.txt", AGENCY.as_bytes()),
            ("feed/stops.txt", STOPS.as_bytes()),
        ]);
        let source = FeedSource::open(zip.path()).unwrap();

        let agencies: Vec<AgencyRow> = source.read_table(Table::Agency).unwrap();
        let stops: Vec<StopRow> = source.read_table(Table::Stops).unwrap();

        assert_eq!(agencies[0].agency_name, "MBTA");
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].stop_name, "Alewife Station");
    }

    #[test]
    fn directory_and_archive_read_identically() {
        let files: [(&str, &[u8]); 1] = [("stops.txt", STOPS.as_bytes())];
        let dir = write_dir(&files);
        let zip = write_zip(&files);

        let from_dir: Vec<StopRow> = FeedSource::open(dir.path())
            .unwrap()
            .read_table(Table::Stops)
            .unwrap();
        let from_zip: Vec<StopRow> = FeedSource::open(zip.path())
            .unwrap()
            .read_table(Table::Stops)
            .unwrap();

        assert_eq!(from_dir, from_zip);
    }

    #[test]
    fn strips_byte_order_mark() {
        let mut contents = vec![0xef, 0xbb, 0xbf];
        contents.extend_from_slice(STOPS.as_bytes());
        let dir = write_dir(&[("stops.txt", contents.as_slice())]);

        let rows: Vec<StopRow> = FeedSource::open(dir.path())
            .unwrap()
            .read_table(Table::Stops)
            .unwrap();

        assert_eq!(rows[0].stop_id, "A");
    }

    #[test]
    fn missing_required_table() {
        let dir = write_dir(&[]);
        let zip = write_zip(&[("agency.txt", AGENCY.as_bytes())]);

        for source in [
            FeedSource::open(dir.path()).unwrap(),
            FeedSource::open(zip.path()).unwrap(),
        ] {
            let err = source.read_table::<StopRow>(Table::Stops).unwrap_err();
            assert_eq!(err.kind(), FeedErrorKind::MissingRequiredFile);
            assert!(err.to_string().contains("stops.txt"));
        }
    }

    #[test]
    fn missing_optional_table_is_none() {
        let dir = write_dir(&[]);
        let source = FeedSource::open(dir.path()).unwrap();

        let rows: Option<Vec<CalendarDateRow>> =
            source.read_optional_table(Table::CalendarDates).unwrap();

        assert!(rows.is_none());
    }

    #[test]
    fn malformed_row_fails_the_table() {
        let dir = write_dir(&[(
            "calendar_dates.txt",
            &b"service_id,date,exception_type\nWK,20240101,1\nWK,not-a-date,2\n"[..],
        )]);
        let source = FeedSource::open(dir.path()).unwrap();

        let err = source
            .read_optional_table::<CalendarDateRow>(Table::CalendarDates)
            .unwrap_err();

        assert_eq!(err.kind(), FeedErrorKind::UnreadableFile);
        assert!(err.to_string().contains("calendar_dates.txt"));
    }

    #[test]
    fn corrupt_archive_is_unreadable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"this is not a zip archive").unwrap();
        let source = FeedSource::open(file.path()).unwrap();

        let err = source.read_table::<AgencyRow>(Table::Agency).unwrap_err();

        assert_eq!(err.kind(), FeedErrorKind::UnreadableFile);
    }

    #[test]
    fn for_each_row_streams_and_counts() {
        let dir = write_dir(&[("stops.txt", STOPS.as_bytes())]);
        let source = FeedSource::open(dir.path()).unwrap();

        let mut kept = Vec::new();
        let count = source
            .for_each_row(Table::Stops, |row: StopRow| {
                if row.stop_id == "D" {
                    kept.push(row);
                }
            })
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn only_calendar_dates_is_optional() {
        let optional: Vec<_> = Table::ALL.iter().filter(|t| !t.is_required()).collect();
        assert_eq!(optional, vec![&Table::CalendarDates]);
    }
}
