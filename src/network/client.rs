//! Client
//!
//! Blocking client for the BucketKV wire protocol.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::engine::Keystore;
use crate::error::{KvError, Result};
use crate::protocol::{read_response, write_command, Command, Request, Response};

/// A connection to a BucketKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|e| KvError::Network(e.to_string()))?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Bound how long a call waits for the server's answer
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send one command and wait for its response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Present credentials for this connection
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<Response> {
        self.send(&Command::Auth {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Upsert `entries` into `bucket`
    pub fn write(&mut self, db: &str, bucket: &str, entries: Keystore) -> Result<Response> {
        self.send(&Command::Write(Request::new(db, bucket, entries)))
    }

    /// Fetch `keys` from `bucket` (every entry if `keys` is empty)
    pub fn read<I, K>(&mut self, db: &str, bucket: &str, keys: I) -> Result<Response>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.send(&Command::Read(Request::with_keys(db, bucket, keys)))
    }

    /// Remove `keys` from `bucket`
    pub fn delete<I, K>(&mut self, db: &str, bucket: &str, keys: I) -> Result<Response>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.send(&Command::Delete(Request::with_keys(db, bucket, keys)))
    }

    /// Health check
    pub fn ping(&mut self) -> Result<Response> {
        self.send(&Command::Ping)
    }
}
