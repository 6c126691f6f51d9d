//! Shared fixtures for integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::TcpListener;
use std::thread;
use zip::write::SimpleFileOptions;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,skyfeed_ingest=debug")))
        .with_test_writer()
        .try_init();
}

/// `;`-separated CSV with a header row, encoded as Windows-1251.
pub fn csv(header: &str, rows: &[&[&str]]) -> Vec<u8> {
    let mut text = format!("{}\r\n", header);
    for row in rows {
        text.push_str(&row.join(";"));
        text.push_str("\r\n");
    }
    let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(&text);
    encoded.into_owned()
}

/// A ZIP archive holding `data` as its only entry.
pub fn zipped(name: &str, data: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(name, SimpleFileOptions::default()).unwrap();
    writer.write_all(data).unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn files(entries: Vec<(&str, Vec<u8>)>) -> HashMap<String, Bytes> {
    entries
        .into_iter()
        .map(|(name, data)| (name.to_string(), Bytes::from(data)))
        .collect()
}

/// A multipart message carrying base64 attachments.
pub fn message(subject: &str, attachments: &[(&str, &str)]) -> Vec<u8> {
    let mut out = format!(
        "From: export@example.com\r\n\
         Subject: {}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"BOUNDARY\"\r\n\
         \r\n\
         --BOUNDARY\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         see attachments\r\n",
        subject
    );
    for (name, body) in attachments {
        out.push_str(&format!(
            "--BOUNDARY\r\n\
             Content-Type: application/octet-stream; name=\"{name}\"\r\n\
             Content-Disposition: attachment; filename=\"{name}\"\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {body}\r\n"
        ));
    }
    out.push_str("--BOUNDARY--\r\n");
    out.into_bytes()
}

/// A one-session POP3 mailbox on localhost.
///
/// Returns the port and a handle yielding the command verbs received.
pub fn serve_mailbox(messages: Vec<Vec<u8>>) -> (u16, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        writer.write_all(b"+OK mailbox ready\r\n").unwrap();

        let mut seen = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            let mut parts = line.split_whitespace();
            let verb = parts.next().unwrap_or_default().to_uppercase();
            let arg = parts.next().unwrap_or_default().to_string();
            seen.push(if arg.is_empty() || verb == "PASS" { verb.clone() } else { format!("{} {}", verb, arg) });

            match verb.as_str() {
                "LIST" => {
                    let mut reply = format!("+OK {} messages\r\n", messages.len());
                    for (i, m) in messages.iter().enumerate() {
                        reply.push_str(&format!("{} {}\r\n", i + 1, m.len()));
                    }
                    reply.push_str(".\r\n");
                    writer.write_all(reply.as_bytes()).unwrap();
                },
                "RETR" => {
                    let index: usize = arg.parse().unwrap();
                    writer.write_all(b"+OK\r\n").unwrap();
                    writer.write_all(&messages[index - 1]).unwrap();
                    writer.write_all(b".\r\n").unwrap();
                },
                "QUIT" => {
                    writer.write_all(b"+OK bye\r\n").unwrap();
                    break;
                },
                _ => writer.write_all(b"+OK\r\n").unwrap(),
            }
        }
        seen
    });

    (port, handle)
}
