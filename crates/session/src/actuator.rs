//! Actuator adapter over any async byte stream.
//!
//! The microcontroller link is a serial device on the deployed hardware; tests
//! use an in-memory duplex. Either way a command is one line of ASCII.
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::ports::{ActuatorError, ActuatorPort, Command};

#[derive(Debug)]
pub struct StreamActuator<W> {
    writer: W,
}

impl<W> StreamActuator<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> ActuatorPort for StreamActuator<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, command: Command) -> Result<(), ActuatorError> {
        self.writer.write_all(command.wire_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
