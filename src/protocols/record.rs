//! Trial records and their framing: a LEB128 varint length followed by the
//! JSON payload, records concatenated back to back.

use super::errors::ProtocolError;

use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    pub rounds: u64,
    pub total_actions: u64,
    pub regret: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TrialRecord {
    pub bandit_name: String,
    pub learner_name: String,
    pub results: Vec<Snapshot>,
}

fn encode_varint(mut value: u64, buffer: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// `None` on a clean end of input before the first byte.
fn decode_varint<R: Read>(reader: &mut R) -> Result<Option<u64>, ProtocolError> {
    let mut value = 0u64;
    for (i, shift) in (0..64).step_by(7).enumerate() {
        let mut byte = [0u8; 1];
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof && i == 0 => return Ok(None),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::CorruptedRecord(
                    "truncated length prefix".to_string(),
                ))
            }
            Err(err) => return Err(err.into()),
        }
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
    }
    Err(ProtocolError::CorruptedRecord(
        "length prefix overflows 64 bits".to_string(),
    ))
}

pub fn encode_record(record: &TrialRecord) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(record)?;
    let mut frame = Vec::with_capacity(payload.len() + 10);
    encode_varint(payload.len() as u64, &mut frame);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Writes one framed record with a single `write_all`, then flushes.
pub fn write_record<W: Write>(writer: &mut W, record: &TrialRecord) -> Result<(), ProtocolError> {
    let frame = encode_record(record)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

pub fn read_records<R: Read>(mut reader: R) -> Result<Vec<TrialRecord>, ProtocolError> {
    let mut records = Vec::new();
    while let Some(length) = decode_varint(&mut reader)? {
        // the prefix is untrusted, only allocate what the stream delivers
        let mut payload = Vec::new();
        let read = reader.by_ref().take(length).read_to_end(&mut payload)?;
        if (read as u64) < length {
            return Err(ProtocolError::CorruptedRecord(format!(
                "truncated payload: {read} of {length} bytes"
            )));
        }
        records.push(serde_json::from_slice(&payload)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::BufWriter;

    fn record(learner_name: &str, regret: f64) -> TrialRecord {
        TrialRecord {
            bandit_name: "MultiArmedBandit".to_string(),
            learner_name: learner_name.to_string(),
            results: vec![
                Snapshot {
                    rounds: 10,
                    total_actions: 10,
                    regret: regret / 2.0,
                },
                Snapshot {
                    rounds: 20,
                    total_actions: 20,
                    regret,
                },
            ],
        }
    }

    #[test]
    fn varint_boundaries() {
        let cases: [(u64, &[u8]); 4] = [
            (0, &[0x00]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (300, &[0xac, 0x02]),
        ];
        for (value, bytes) in cases {
            let mut buffer = Vec::new();
            encode_varint(value, &mut buffer);
            assert_eq!(buffer, bytes);
            assert_eq!(decode_varint(&mut &buffer[..]).unwrap(), Some(value));
        }
        assert_eq!(decode_varint(&mut &[][..]).unwrap(), None);
    }

    #[test]
    fn records_concatenate_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.bin");
        let records = vec![record("ucb", 4.0), record("thompson_sampling", 2.5)];

        let mut writer = BufWriter::new(File::create(&path).unwrap());
        for record in &records {
            write_record(&mut writer, record).unwrap();
        }
        drop(writer);

        let read = read_records(File::open(&path).unwrap()).unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn long_payloads_use_multi_byte_prefixes() {
        let mut long = record(&"x".repeat(300), 1.0);
        long.results.push(Snapshot {
            rounds: 30,
            total_actions: 30,
            regret: 1.5,
        });
        let frame = encode_record(&long).unwrap();
        assert!(frame[0] & 0x80 != 0);
        assert_eq!(read_records(&frame[..]).unwrap(), vec![long]);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let frame = encode_record(&record("ucb", 1.0)).unwrap();
        let truncated = &frame[..frame.len() - 3];
        assert!(matches!(
            read_records(truncated),
            Err(ProtocolError::CorruptedRecord(_))
        ));
        assert!(matches!(
            read_records(&[0x80][..]),
            Err(ProtocolError::CorruptedRecord(_))
        ));
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x3f, b'{', b'}'];
        assert!(matches!(
            read_records(&bytes[..]),
            Err(ProtocolError::CorruptedRecord(_))
        ));
    }
}
