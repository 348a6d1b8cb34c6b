use std::error::Error;
use std::fmt;

/// Header of the student ID column
pub const STUDENT_ID_COLUMN: &str = "學號";
/// Header of the student name column
pub const NAME_COLUMN: &str = "姓名";
/// Header of the password column
pub const PASSWORD_COLUMN: &str = "密碼";

/// Columns that identify a student and are never shown in a report
pub const IDENTITY_COLUMNS: [&str; 3] = [STUDENT_ID_COLUMN, NAME_COLUMN, PASSWORD_COLUMN];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The export had no header row
    Empty,

    /// A required column is absent from the header row
    MissingColumn(&'static str),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Empty => write!(f, "grade table is empty"),
            TableError::MissingColumn(name) => write!(f, "grade table has no {} column", name),
        }
    }
}

impl Error for TableError {}

/// One score column of a student's row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreCell {
    pub column: String,
    pub value: String,
}

/// The row matched for a student, split into identity and score columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    pub password: String,

    /// Remaining columns in header order
    pub scores: Vec<ScoreCell>,
}

impl StudentRecord {
    /// Exact comparison against the stored password
    ///
    /// A blank stored password never matches, so a row without a password
    /// cannot be opened with an empty form field.
    pub fn password_matches(&self, password: &str) -> bool {
        !self.password.is_empty() && self.password == password
    }
}

/// A class's grade sheet with every cell kept as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl GradeTable {
    /// Parse a CSV export into a table
    ///
    /// The first non-blank record is the header row; headers are trimmed and
    /// stripped of `"` characters. Cells are kept verbatim. Short rows are
    /// padded with empty cells and extra cells are dropped.
    ///
    /// # Examples
    /// ```
    /// use gradebook::table::GradeTable;
    ///
    /// let table = GradeTable::parse("學號,姓名,密碼,數學\n123,王小明,abc,90\n").unwrap();
    /// assert_eq!(table.headers(), ["學號", "姓名", "密碼", "數學"]);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = parse_csv_records(text)
            .into_iter()
            .filter(|record| !is_blank_record(record));

        let headers: Vec<String> = records
            .next()
            .ok_or(TableError::Empty)?
            .iter()
            .map(|header| normalize_header(header))
            .collect();

        let width = headers.len();
        let rows = records
            .map(|mut record| {
                record.resize(width, String::new());
                record
            })
            .collect();

        Ok(GradeTable { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &'static str) -> Result<usize, TableError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or(TableError::MissingColumn(name))
    }

    /// Find the first row whose student ID equals `student_id`
    ///
    /// Rows with a blank student ID never match.
    ///
    /// # Errors
    /// * Returns `TableError::MissingColumn` if the ID, name or password column is absent
    pub fn find_student(&self, student_id: &str) -> Result<Option<StudentRecord>, TableError> {
        let id_col = self.column_index(STUDENT_ID_COLUMN)?;
        let name_col = self.column_index(NAME_COLUMN)?;
        let password_col = self.column_index(PASSWORD_COLUMN)?;

        let Some(row) = self
            .rows
            .iter()
            .find(|row| !row[id_col].is_empty() && row[id_col] == student_id)
        else {
            return Ok(None);
        };

        let scores = self
            .headers
            .iter()
            .zip(row)
            .filter(|(header, _)| !IDENTITY_COLUMNS.contains(&header.as_str()))
            .map(|(header, value)| ScoreCell {
                column: header.clone(),
                value: value.clone(),
            })
            .collect();

        Ok(Some(StudentRecord {
            student_id: row[id_col].clone(),
            name: row[name_col].clone(),
            password: row[password_col].clone(),
            scores,
        }))
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().replace('"', "")
}

fn is_blank_record(record: &[String]) -> bool {
    record.len() == 1 && record[0].trim().is_empty()
}

// Split CSV text into records; quoted fields may hold commas, newlines and "" escapes
fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
                records.push(std::mem::take(&mut record));
            }
            _ => current_field.push(c),
        }
    }

    // Last record without a trailing newline
    if !current_field.is_empty() || !record.is_empty() {
        record.push(current_field);
        records.push(record);
    }

    records
}
