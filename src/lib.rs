/*!
# Grade Lookup

A small web form where students look up their own scores, built in Rust.

## Overview

Teachers publish each class's grade sheet as a CSV export. A student enters
their student ID, password and class code; the server downloads the class's
export, checks the credentials against the student's row and shows the rest of
the row as a table.

## Architecture

### Web Layer
- **Technologies**: axum, handlebars
- `GET /` - the query form
- `POST /query` - form fields `student_id`, `password`, `class_id`; answers
  with the score table or a message, always with a link back to the form

### Data Layer
- **Class Registry** - immutable class code → export URL mapping built at startup
- **Fetcher** - downloads an export with reqwest; only `200 OK` is a success
- **Grade Cache** - one `<class_id>.csv` per class, written atomically and
  tagged with the time of the last successful fetch; each class has its own lock
- **Grade Table** - CSV parsing with normalised headers (`學號`, `姓名`, `密碼`
  plus score columns)

## Lookup outcomes

| Outcome | Response |
|---------|----------|
| Unknown class or failed download | download-failed message naming the class |
| Student ID not in the sheet | student-not-found message |
| Password mismatch | wrong-password message |
| Match | heading with name and ID, then the score columns |
| Unreadable cache file or malformed sheet | HTTP 500 |

## Modules

- **config**: class registry, refresh policy and server settings
- **table**: CSV parsing and student lookup
- **fetcher**: HTTP download of sheet exports
- **cache**: per-class cache files and refresh policy
- **render**: HTML pages
- **query**: the lookup pipeline behind `POST /query`
- **app**: routing and server startup
*/

pub mod config;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod cache;
#[cfg(feature = "web")]
pub mod fetcher;
#[cfg(feature = "web")]
pub mod query;
#[cfg(feature = "web")]
pub mod render;

/// Re-export everything from these modules to make it easier to use
pub use config::*;
pub use table::*;

#[cfg(feature = "web")]
pub use cache::*;
#[cfg(feature = "web")]
pub use fetcher::*;
#[cfg(feature = "web")]
pub use query::*;
#[cfg(feature = "web")]
pub use render::*;
