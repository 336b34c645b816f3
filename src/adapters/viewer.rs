//! FITS viewer launcher.
//!
//! Starts the configured program (`ds9` by default) with the frame path
//! as its only argument and returns without waiting for it.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;

use crate::app::ports::ImageViewer;

pub struct ProgramViewer {
    program: String,
}

impl ProgramViewer {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_owned(),
        }
    }
}

impl ImageViewer for ProgramViewer {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        let child = Command::new(&self.program)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!("{} started as pid {}", self.program, child.id());
        Ok(())
    }
}
