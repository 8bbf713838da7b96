//! Transit timetable report builder.
//!
//! Reads a GTFS feed (a directory or zip archive of CSV tables) and answers,
//! for each selected route: which stops does it serve in each direction,
//! when does each trip reach them, and on which dates does each service
//! pattern run.

pub mod assembler;
pub mod calendar;
pub mod domain;
pub mod feed;
pub mod settings;
