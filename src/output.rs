// src/output.rs
//! Human-readable listing of a loaded store

use colored::Colorize;
use std::io::{self, Write};

use crate::store::{AcceptedRoots, RootsLookup};

/// Writes each log's accepted roots, in LogID order
pub struct RootsListing<W: Write> {
    writer: W,
    use_colors: bool,
}

impl RootsListing<io::Stdout> {
    /// Listing on stdout, colored when stdout is a terminal
    pub fn stdout() -> Self {
        Self {
            writer: io::stdout(),
            use_colors: is_terminal::is_terminal(io::stdout()),
        }
    }
}

impl<W: Write> RootsListing<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            use_colors: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write(&mut self, roots: &AcceptedRoots) -> io::Result<()> {
        for log_id in roots.hash_by_log().keys() {
            match roots.roots_for_log(log_id) {
                RootsLookup::Found { hash, roots } => {
                    let header = format!("{} ({})", log_id, hash);
                    writeln!(self.writer)?;
                    if self.use_colors {
                        writeln!(self.writer, "{}", header.cyan().bold())?;
                    } else {
                        writeln!(self.writer, "{}", header)?;
                    }
                    for cert in roots.iter() {
                        writeln!(
                            self.writer,
                            "  {} (expires {})",
                            cert.subject,
                            cert.not_after.format("%Y-%m-%d")
                        )?;
                    }
                }
                RootsLookup::NoRootsFound { .. } | RootsLookup::UnknownLog => {
                    let line = format!("No accepted roots found for log with ID {}", log_id);
                    if self.use_colors {
                        writeln!(self.writer, "{}", line.yellow())?;
                    } else {
                        writeln!(self.writer, "{}", line)?;
                    }
                }
            }
        }

        self.writer.flush()
    }
}
