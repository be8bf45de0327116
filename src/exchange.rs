//! Double-buffered frame handoff between the synthesis thread and the
//! sink thread.
//!
//! A single frame is shared. Ownership strictly alternates: the producer
//! fills it under the lock and then blocks until the consumer has copied
//! it out; the consumer blocks until a full frame is available. Exactly
//! one 100 ms frame is ever in flight, so the consumer never sees a
//! half-written buffer and the producer never overwrites an uncopied one.

use std::sync::{Arc, Condvar, Mutex};

use crate::modulator::IqSample;

struct State {
    frame: Vec<IqSample>,
    full: bool,
    stop: bool,
}

pub struct Exchange {
    state: Mutex<State>,
    /// Signalled when the frame has been filled.
    full_cv: Condvar,
    /// Signalled when the frame has been copied out.
    copied_cv: Condvar,
}

impl Exchange {
    pub fn new(len: usize) -> Arc<Exchange> {
        Arc::new(Exchange {
            state: Mutex::new(State {
                frame: vec![IqSample::new(0, 0); len],
                full: false,
                stop: false,
            }),
            full_cv: Condvar::new(),
            copied_cv: Condvar::new(),
        })
    }

    /// Fill the shared frame and wait until the consumer has copied it.
    /// Returns false when the exchange has been stopped; the fill may
    /// then have been skipped.
    pub fn produce<F>(&self, fill: F) -> bool
    where
        F: FnOnce(&mut [IqSample]),
    {
        let mut st = self.state.lock().unwrap();
        if st.stop {
            return false;
        }

        fill(&mut st.frame);
        st.full = true;
        self.full_cv.notify_one();

        while st.full && !st.stop {
            st = self.copied_cv.wait(st).unwrap();
        }
        !st.stop
    }

    /// Wait for a full frame and copy it into `out`. Returns false when
    /// the exchange has been stopped with no frame pending.
    pub fn consume(&self, out: &mut Vec<IqSample>) -> bool {
        let mut st = self.state.lock().unwrap();
        while !st.full {
            if st.stop {
                return false;
            }
            st = self.full_cv.wait(st).unwrap();
        }

        out.clear();
        out.extend_from_slice(&st.frame);
        st.full = false;
        self.copied_cv.notify_one();
        true
    }

    /// Stop both sides and wake whichever one is blocked.
    pub fn request_stop(&self) {
        let mut st = self.state.lock().unwrap();
        st.stop = true;
        self.full_cv.notify_all();
        self.copied_cv.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn frames_arrive_in_order_and_complete() {
        let ex = Exchange::new(64);
        let consumer = {
            let ex = Arc::clone(&ex);
            thread::spawn(move || {
                let mut seen = Vec::new();
                let mut local = Vec::new();
                while ex.consume(&mut local) {
                    seen.push(local[0].re);
                }
                seen
            })
        };

        for k in 0..50i16 {
            let ok = ex.produce(|buf| {
                for s in buf.iter_mut() {
                    *s = IqSample::new(k, -k);
                }
            });
            assert!(ok);
        }
        ex.request_stop();

        let seen = consumer.join().unwrap();
        let expect: Vec<i16> = (0..50).collect();
        assert_eq!(seen, expect);
    }

    #[test]
    fn stop_unblocks_producer() {
        let ex = Exchange::new(8);
        // No consumer: the first produce would block forever without the
        // stop path.
        let stopper = {
            let ex = Arc::clone(&ex);
            thread::spawn(move || {
                thread::sleep(std::time::Duration::from_millis(50));
                ex.request_stop();
            })
        };
        let ok = ex.produce(|buf| buf[0] = IqSample::new(1, 1));
        assert!(!ok);
        stopper.join().unwrap();
    }

    #[test]
    fn stop_unblocks_consumer() {
        let ex = Exchange::new(8);
        let stopper = {
            let ex = Arc::clone(&ex);
            thread::spawn(move || {
                thread::sleep(std::time::Duration::from_millis(50));
                ex.request_stop();
            })
        };
        let mut local = Vec::new();
        assert!(!ex.consume(&mut local));
        stopper.join().unwrap();
    }
}
