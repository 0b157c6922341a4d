//! In-process SMTP sink for integration tests.
//!
//! Speaks just enough ESMTP for lettre: EHLO with `AUTH PLAIN`, MAIL, RCPT,
//! DATA, RSET, NOOP and QUIT. Every accepted message is pushed to a channel
//! before the final `250` goes out, so it is available as soon as the
//! client's `send` returns.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, mpsc};
use std::thread;

/// A message accepted by the sink
#[derive(Debug, Clone)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    /// Raw DATA section, dot-unstuffed, lines joined with `\n`
    pub data: String,
    /// Initial response of `AUTH PLAIN`, still base64 encoded
    pub auth: Option<String>,
}

impl Email {
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.to.iter().any(|addr| addr == recipient)
    }

    /// Header value by case-insensitive name, unfolded
    pub fn header(&self, name: &str) -> Option<String> {
        let mut lines = self.data.lines().take_while(|l| !l.is_empty()).peekable();
        while let Some(line) = lines.next() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            if !key.eq_ignore_ascii_case(name) {
                continue;
            }
            let mut value = value.trim().to_string();
            while let Some(next) = lines.next_if(|l| l.starts_with([' ', '\t'])) {
                value.push(' ');
                value.push_str(next.trim());
            }
            return Some(value);
        }
        None
    }
}

pub struct SmtpSink {
    hostname: String,
    rejected: Arc<HashSet<String>>,
}

impl SmtpSink {
    pub fn new() -> Self {
        Self {
            hostname: "sink.local".to_string(),
            rejected: Arc::new(HashSet::new()),
        }
    }

    /// Answer `RCPT TO` for `address` with a permanent failure
    pub fn reject(mut self, address: &str) -> Self {
        Arc::make_mut(&mut self.rejected).insert(address.to_string());
        self
    }

    /// Bind an ephemeral port and serve in the background
    pub fn start(self) -> (u16, mpsc::Receiver<Email>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let hostname = self.hostname.clone();
                let rejected = Arc::clone(&self.rejected);
                let tx = tx.clone();
                // Pooled clients may keep a connection open, so serve each
                // one on its own thread
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, &hostname, &rejected, &tx) {
                        eprintln!("Error handling client: {e}");
                    }
                });
            }
        });

        (port, rx)
    }
}

#[derive(Default)]
struct Transaction {
    from: Option<String>,
    to: Vec<String>,
}

fn handle_client(
    mut stream: TcpStream,
    hostname: &str,
    rejected: &HashSet<String>,
    tx: &mpsc::Sender<Email>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut transaction = Transaction::default();
    let mut auth = None;

    reply(&mut stream, &format!("220 {hostname} ESMTP sink"))?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let command = line.trim_end();
        let verb = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        match verb.as_str() {
            "EHLO" => reply(
                &mut stream,
                &format!("250-{hostname}\r\n250-AUTH PLAIN\r\n250 8BITMIME"),
            )?,
            "HELO" => reply(&mut stream, &format!("250 {hostname}"))?,
            "AUTH" => {
                auth = command.split_whitespace().nth(2).map(str::to_string);
                reply(&mut stream, "235 2.7.0 Authentication successful")?;
            }
            "MAIL" => {
                transaction = Transaction {
                    from: Some(path(command)),
                    to: Vec::new(),
                };
                reply(&mut stream, "250 OK")?;
            }
            "RCPT" => {
                let recipient = path(command);
                if rejected.contains(&recipient) {
                    reply(&mut stream, "550 5.1.1 Mailbox unavailable")?;
                } else {
                    transaction.to.push(recipient);
                    reply(&mut stream, "250 OK")?;
                }
            }
            "DATA" => {
                reply(&mut stream, "354 End data with <CR><LF>.<CR><LF>")?;
                let data = read_data(&mut reader)?;
                let email = Email {
                    from: transaction.from.take().unwrap_or_default(),
                    to: std::mem::take(&mut transaction.to),
                    data,
                    auth: auth.clone(),
                };
                let _ = tx.send(email);
                reply(&mut stream, "250 OK queued")?;
            }
            "RSET" => {
                transaction = Transaction::default();
                reply(&mut stream, "250 OK")?;
            }
            "NOOP" => reply(&mut stream, "250 OK")?,
            "QUIT" => {
                reply(&mut stream, "221 Bye")?;
                return Ok(());
            }
            _ => reply(&mut stream, "500 Command not recognized")?,
        }
    }
}

fn reply(stream: &mut TcpStream, response: &str) -> io::Result<()> {
    write!(stream, "{response}\r\n")?;
    stream.flush()
}

/// Address between the angle brackets of `MAIL FROM:<..>` / `RCPT TO:<..>`
fn path(command: &str) -> String {
    command
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(addr, _)| addr.to_string())
        .unwrap_or_default()
}

fn read_data(reader: &mut impl BufRead) -> io::Result<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let content = line.trim_end_matches(['\r', '\n']);
        if content == "." {
            break;
        }
        lines.push(content.strip_prefix('.').unwrap_or(content).to_string());
    }
    Ok(lines.join("\n"))
}
