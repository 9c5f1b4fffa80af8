use thiserror::Error;

use crate::{EventKind, FieldValue, RawEvent, TraceEvent};

/// Errors that can occur while decoding a raw event
#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("{event}: missing field `{field}`")]
    MissingField { event: String, field: &'static str },

    #[error("{event}: field `{field}` should be an integer, got {value}")]
    NotAnInteger {
        event: String,
        field: &'static str,
        value: FieldValue,
    },

    #[error("{event}: field `{field}` should be a string, got {value}")]
    NotAString {
        event: String,
        field: &'static str,
        value: FieldValue,
    },

    #[error("{event}: field `{field}` value {value} is out of range")]
    OutOfRange {
        event: String,
        field: &'static str,
        value: i64,
    },
}

const SYSCALL_ENTRY_PREFIXES: [&str; 2] = ["syscall_entry_", "sys_"];

impl TraceEvent {
    /// Resolves a raw event into its typed form.
    ///
    /// Event names the engine does not track decode to [`EventKind::Other`].
    /// A tracked event that lacks a required attribute, or carries one of the
    /// wrong type, is an error.
    pub fn decode(raw: &RawEvent) -> Result<Self, DecodeError> {
        let kind = decode_kind(raw)?;
        Ok(TraceEvent::new(raw.timestamp, raw.cpu, kind))
    }
}

fn decode_kind(raw: &RawEvent) -> Result<EventKind, DecodeError> {
    let fields = Fields(raw);
    let name = raw.name.as_str();

    let kind = match name {
        "sched_switch" => EventKind::Switch {
            prev_tid: fields.required_u32("prev_tid")?,
            next_tid: fields.required_u32("next_tid")?,
            prev_comm: fields.optional_str("prev_comm")?,
            next_comm: fields.optional_str("next_comm")?,
        },
        "sched_migrate_task" => EventKind::Migrate {
            tid: fields.required_u32("tid")?,
            src_cpu: fields.required_u32("orig_cpu")?,
            dst_cpu: fields.required_u32("dest_cpu")?,
            comm: fields.optional_str("comm")?,
        },
        "exit_syscall" => EventKind::SyscallExit {
            tid: fields.optional_u32("tid")?,
        },
        "block_bio_queue" | "block_rq_issue" => EventKind::BlockQueue {
            device: fields.required_u64("dev")?,
            request_id: fields.required_u64("sector")?,
            sectors: fields.required_u64("nr_sector")?,
        },
        "block_bio_complete" | "block_rq_complete" => EventKind::BlockComplete {
            device: fields.required_u64("dev")?,
            request_id: fields.required_u64("sector")?,
        },
        _ if name.starts_with("syscall_exit_") => EventKind::SyscallExit {
            tid: fields.optional_u32("tid")?,
        },
        _ => match syscall_entry_name(name) {
            Some(syscall) => EventKind::SyscallEntry {
                tid: fields.optional_u32("tid")?,
                name: syscall.to_string(),
            },
            None => EventKind::Other(name.to_string()),
        },
    };

    Ok(kind)
}

/// Extracts the system call name from an entry event name
fn syscall_entry_name(event_name: &str) -> Option<&str> {
    SYSCALL_ENTRY_PREFIXES
        .iter()
        .find_map(|prefix| event_name.strip_prefix(prefix))
        .filter(|syscall| !syscall.is_empty())
}

/// Typed accessors over a raw event's attributes
struct Fields<'a>(&'a RawEvent);

impl Fields<'_> {
    fn optional_int(&self, field: &'static str) -> Result<Option<i64>, DecodeError> {
        match self.0.field(field) {
            None => Ok(None),
            Some(FieldValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(DecodeError::NotAnInteger {
                event: self.0.name.clone(),
                field,
                value: other.clone(),
            }),
        }
    }

    fn required_int(&self, field: &'static str) -> Result<i64, DecodeError> {
        self.optional_int(field)?
            .ok_or_else(|| DecodeError::MissingField {
                event: self.0.name.clone(),
                field,
            })
    }

    fn out_of_range(&self, field: &'static str, value: i64) -> DecodeError {
        DecodeError::OutOfRange {
            event: self.0.name.clone(),
            field,
            value,
        }
    }

    fn optional_u32(&self, field: &'static str) -> Result<Option<u32>, DecodeError> {
        match self.optional_int(field)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| self.out_of_range(field, v)),
        }
    }

    fn required_u32(&self, field: &'static str) -> Result<u32, DecodeError> {
        let v = self.required_int(field)?;
        u32::try_from(v).map_err(|_| self.out_of_range(field, v))
    }

    fn required_u64(&self, field: &'static str) -> Result<u64, DecodeError> {
        let v = self.required_int(field)?;
        u64::try_from(v).map_err(|_| self.out_of_range(field, v))
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<String>, DecodeError> {
        match self.0.field(field) {
            None => Ok(None),
            Some(FieldValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(DecodeError::NotAString {
                event: self.0.name.clone(),
                field,
                value: other.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_decode_switch() {
        let raw = RawEvent::new("sched_switch", 1_000, 2)
            .with_field("prev_tid", 10i64)
            .with_field("next_tid", 20i64)
            .with_field("prev_comm", "bash")
            .with_field("next_comm", "make");

        let event = TraceEvent::decode(&raw).unwrap();
        assert_eq!(event.timestamp, 1_000);
        assert_eq!(event.cpu, 2);
        assert_eq!(
            event.kind,
            EventKind::Switch {
                prev_tid: 10,
                next_tid: 20,
                prev_comm: Some("bash".to_string()),
                next_comm: Some("make".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_migrate() {
        let raw = RawEvent::new("sched_migrate_task", 5, 0)
            .with_field("tid", 42i64)
            .with_field("orig_cpu", 1i64)
            .with_field("dest_cpu", 3i64);

        let event = TraceEvent::decode(&raw).unwrap();
        assert_eq!(
            event.kind,
            EventKind::Migrate {
                tid: 42,
                src_cpu: 1,
                dst_cpu: 3,
                comm: None,
            }
        );
    }

    #[rstest]
    #[case("sys_read", "read")]
    #[case("sys_clock_gettime", "clock_gettime")]
    #[case("syscall_entry_openat", "openat")]
    fn test_decode_syscall_entry(#[case] event_name: &str, #[case] syscall: &str) {
        let raw = RawEvent::new(event_name, 5, 0);
        let event = TraceEvent::decode(&raw).unwrap();
        assert_eq!(
            event.kind,
            EventKind::SyscallEntry {
                tid: None,
                name: syscall.to_string(),
            }
        );
    }

    #[rstest]
    #[case("exit_syscall")]
    #[case("syscall_exit_openat")]
    fn test_decode_syscall_exit(#[case] event_name: &str) {
        let raw = RawEvent::new(event_name, 5, 0).with_field("tid", 7i64);
        let event = TraceEvent::decode(&raw).unwrap();
        assert_eq!(event.kind, EventKind::SyscallExit { tid: Some(7) });
    }

    #[test]
    fn test_decode_block_events() {
        let queue = RawEvent::new("block_bio_queue", 100, 0)
            .with_field("dev", 8_388_608i64)
            .with_field("sector", 2048i64)
            .with_field("nr_sector", 8i64);
        assert_eq!(
            TraceEvent::decode(&queue).unwrap().kind,
            EventKind::BlockQueue {
                device: 8_388_608,
                request_id: 2048,
                sectors: 8,
            }
        );

        let complete = RawEvent::new("block_rq_complete", 350, 0)
            .with_field("dev", 8_388_608i64)
            .with_field("sector", 2048i64)
            .with_field("nr_sector", 8i64);
        assert_eq!(
            TraceEvent::decode(&complete).unwrap().kind,
            EventKind::BlockComplete {
                device: 8_388_608,
                request_id: 2048,
            }
        );
    }

    #[rstest]
    #[case("irq_handler_entry")]
    #[case("sys_")]
    #[case("sched_wakeup")]
    fn test_unknown_events_are_other(#[case] event_name: &str) {
        let raw = RawEvent::new(event_name, 5, 0).with_field("irq", 3i64);
        let event = TraceEvent::decode(&raw).unwrap();
        assert_eq!(event.kind, EventKind::Other(event_name.to_string()));
        assert_eq!(event.kind.label(), event_name);
    }

    #[test]
    fn test_missing_field() {
        let raw = RawEvent::new("sched_switch", 5, 0).with_field("prev_tid", 1i64);

        let result = TraceEvent::decode(&raw);
        assert_eq!(
            result,
            Err(DecodeError::MissingField {
                event: "sched_switch".to_string(),
                field: "next_tid",
            })
        );
    }

    #[test]
    fn test_wrong_field_types() {
        let raw = RawEvent::new("sched_switch", 5, 0)
            .with_field("prev_tid", "one")
            .with_field("next_tid", 2i64);
        assert!(matches!(
            TraceEvent::decode(&raw),
            Err(DecodeError::NotAnInteger { field: "prev_tid", .. })
        ));

        let raw = RawEvent::new("sched_migrate_task", 5, 0)
            .with_field("tid", 1i64)
            .with_field("orig_cpu", 0i64)
            .with_field("dest_cpu", 1i64)
            .with_field("comm", 12i64);
        assert!(matches!(
            TraceEvent::decode(&raw),
            Err(DecodeError::NotAString { field: "comm", .. })
        ));
    }

    #[test]
    fn test_negative_tid_out_of_range() {
        let raw = RawEvent::new("exit_syscall", 5, 0).with_field("tid", -1i64);

        let err = TraceEvent::decode(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "exit_syscall: field `tid` value -1 is out of range"
        );
    }
}
