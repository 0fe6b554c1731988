use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use npilink_frame::Frame;
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// Matches outstanding synchronous requests to arriving SRSP frames.
///
/// The router signals this side by pushing every SRSP onto the dedicated
/// response queue; the correlator waits on that queue until a fixed
/// deadline of retry count times interval, discarding responses whose
/// opcode does not match the outstanding request. Discards do not shorten
/// the wait: stale responses left over from a timed-out request must not
/// eat into the next request's budget. One outstanding request at a time
/// is assumed; the link serializes callers, so opcode alone is a
/// sufficient key.
#[derive(Debug)]
pub struct SrspCorrelator {
    rx: Receiver<Frame>,
    retry_count: u32,
    poll_interval: Duration,
}

impl SrspCorrelator {
    pub fn new(rx: Receiver<Frame>, config: &LinkConfig) -> Self {
        Self {
            rx,
            retry_count: config.srsp_retry_count,
            poll_interval: config.srsp_poll_interval,
        }
    }

    /// Block until the SRSP matching `expected_opcode` arrives.
    ///
    /// Gives up at the deadline (`retry_count` times `poll_interval` after
    /// entry) and returns `SrspTimeout`; a disconnected queue (link shut
    /// down) returns `Closed` immediately.
    pub fn await_srsp(&self, expected_opcode: u8) -> Result<Frame> {
        let started = Instant::now();
        let deadline = started + self.poll_interval * self.retry_count;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(frame) if frame.opcode() == expected_opcode => return Ok(frame),
                Ok(frame) => {
                    debug!(
                        got = format_args!("{:#04x}", frame.opcode()),
                        expected = format_args!("{expected_opcode:#04x}"),
                        "unrelated synchronous response discarded"
                    );
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return Err(LinkError::Closed),
            }
        }
        Err(LinkError::SrspTimeout {
            opcode: expected_opcode,
            attempts: self.retry_count,
            waited: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use crossbeam::channel::bounded;
    use npilink_frame::{CmdType, Subsystem};

    use super::*;

    fn srsp(opcode: u8) -> Frame {
        Frame::new(CmdType::Srsp, Subsystem::Sys, opcode, Bytes::new())
    }

    fn test_config(retries: u32, interval_ms: u64) -> LinkConfig {
        LinkConfig {
            srsp_retry_count: retries,
            srsp_poll_interval: Duration::from_millis(interval_ms),
            ..LinkConfig::default()
        }
    }

    #[test]
    fn returns_matching_response() {
        let (tx, rx) = bounded(4);
        let correlator = SrspCorrelator::new(rx, &test_config(10, 10));

        tx.send(srsp(0x02)).unwrap();
        let frame = correlator.await_srsp(0x02).unwrap();
        assert_eq!(frame.opcode(), 0x02);
    }

    #[test]
    fn discards_unrelated_responses_until_match() {
        let (tx, rx) = bounded(8);
        let correlator = SrspCorrelator::new(rx, &test_config(20, 10));

        tx.send(srsp(0x01)).unwrap();
        tx.send(srsp(0x33)).unwrap();
        tx.send(srsp(0x02)).unwrap();
        tx.send(srsp(0x01)).unwrap();

        let frame = correlator.await_srsp(0x02).unwrap();
        assert_eq!(frame.opcode(), 0x02);
        // The trailing unrelated frame is still queued, untouched.
        assert_eq!(correlator.rx.try_recv().unwrap().opcode(), 0x01);
    }

    #[test]
    fn times_out_after_retry_budget() {
        let (_tx, rx) = bounded::<Frame>(4);
        let correlator = SrspCorrelator::new(rx, &test_config(5, 10));

        let started = Instant::now();
        let err = correlator.await_srsp(0x02).unwrap_err();
        let elapsed = started.elapsed();

        match err {
            LinkError::SrspTimeout {
                opcode, attempts, ..
            } => {
                assert_eq!(opcode, 0x02);
                assert_eq!(attempts, 5);
            }
            other => panic!("expected SrspTimeout, got {other:?}"),
        }
        // 5 attempts x 10 ms, with scheduling slack on the upper side.
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn queued_mismatches_do_not_consume_the_budget() {
        let (tx, rx) = bounded(8);
        let correlator = SrspCorrelator::new(rx, &test_config(5, 20));

        // Stale responses from an earlier timed-out request, drained in
        // microseconds; the wait for the real one must still run the full
        // 5 x 20 ms.
        for _ in 0..5 {
            tx.send(srsp(0x33)).unwrap();
        }

        let started = Instant::now();
        let err = correlator.await_srsp(0x01).unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, LinkError::SrspTimeout { .. }));
        assert!(
            elapsed >= Duration::from_millis(100),
            "timed out after {elapsed:?}, deadline is 100ms"
        );
    }

    #[test]
    fn disconnected_queue_reports_closed() {
        let (tx, rx) = bounded::<Frame>(4);
        let correlator = SrspCorrelator::new(rx, &test_config(100, 50));
        drop(tx);

        let err = correlator.await_srsp(0x01).unwrap_err();
        assert!(matches!(err, LinkError::Closed));
    }

    #[test]
    fn late_response_within_budget_is_caught() {
        let (tx, rx) = bounded(4);
        let correlator = SrspCorrelator::new(rx, &test_config(50, 10));

        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            tx.send(srsp(0xEE)).unwrap();
        });

        let frame = correlator.await_srsp(0xEE).unwrap();
        assert_eq!(frame.opcode(), 0xEE);
        sender.join().unwrap();
    }
}
