use std::{
    io,
    process::{Child, ChildStdout, Command, ExitStatus, Stdio},
};

use crate::error::{DecodeError, Result};

/// A spawned decode process and its raw frame output.
pub struct DecodeProcess {
    program: String,
    child: Child,
    stdout: Option<ChildStdout>,
    exit_status: Option<ExitStatus>,
}

impl DecodeProcess {
    /// Spawns `command` with stdout captured. stdin is closed unless the
    /// command already configured it.
    pub fn spawn(mut command: Command) -> Result<Self> {
        let program = command.get_program().to_string_lossy().into_owned();
        command.stdout(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| DecodeError::launch(program.clone(), e))?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DecodeError::launch(
                program,
                io::Error::other("stdout was not captured"),
            ));
        };

        log::debug!("{} started with pid {}", program, child.id());
        Ok(Self {
            program,
            child,
            stdout: Some(stdout),
            exit_status: None,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Hands out the output stream. Only the first call returns it.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Closes our end of the pipe and waits for the process to exit.
    ///
    /// A process still writing frames sees a broken pipe and exits on its own.
    pub fn reap(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        drop(self.stdout.take());
        let status = self.child.wait()?;
        self.exit_status = Some(status);
        Ok(status)
    }
}

impl Drop for DecodeProcess {
    fn drop(&mut self) {
        if self.exit_status.is_some() {
            return;
        }
        // never run: nobody will read the output, so don't let it linger
        log::warn!("{} (pid {}) dropped before exit, killing", self.program, self.id());
        drop(self.stdout.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
