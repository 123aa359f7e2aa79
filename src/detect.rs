use crate::geometry::{GeometrySnapshot, POSITION_TOLERANCE};
use crate::host::{Candidate, CandidateQuery, HostPage};
use crate::settings::Settings;
use std::time::{Duration, Instant};

/// Result of one detector poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectOutcome {
    /// No stable candidate yet; keep pumping.
    Pending,
    /// A candidate held still long enough to be trusted.
    Found(Candidate),
    /// The attempt's overall bound expired. Terminal; the caller decides
    /// when a new attempt is warranted.
    TimedOut,
}

/// Last accepted sample of the candidate under observation.
struct DwellAnchor {
    candidate: Candidate,
    geometry: GeometrySnapshot,
    since: Instant,
}

/// Waits for the discovery query to produce a composer that has existed,
/// been visible, and held a stationary geometry for a minimum dwell time.
///
/// Host boots churn through transient composer nodes; binding too early
/// attaches the overlay to a node about to be discarded. The dwell clock
/// resets whenever the candidate moves more than [`POSITION_TOLERANCE`] on
/// any axis, or is swapped for a different node.
pub struct StabilityDetector {
    query: CandidateQuery,
    min_size: (f64, f64),
    dwell: Duration,
    poll_interval: Duration,
    deadline: Instant,
    last_poll: Option<Instant>,
    anchor: Option<DwellAnchor>,
}

impl StabilityDetector {
    pub fn new(query: CandidateQuery, settings: &Settings, now: Instant) -> Self {
        Self {
            query,
            min_size: settings.detect_min_size,
            dwell: settings.detect_dwell(),
            poll_interval: settings.detect_poll(),
            deadline: now + settings.detect_timeout(),
            last_poll: None,
            anchor: None,
        }
    }

    /// Evaluate the query once, rate-limited to the poll interval. Call from
    /// the engine tick until the outcome stops being [`DetectOutcome::Pending`].
    pub fn poll(&mut self, host: &dyn HostPage, now: Instant) -> DetectOutcome {
        if let Some(last) = self.last_poll {
            if now.duration_since(last) < self.poll_interval {
                return self.pending_or_timeout(now);
            }
        }
        self.last_poll = Some(now);

        let Some(candidate) = host.find_candidate(&self.query) else {
            self.anchor = None;
            return self.pending_or_timeout(now);
        };
        let Some(geometry) = host.geometry(candidate.editable) else {
            self.anchor = None;
            return self.pending_or_timeout(now);
        };
        if !geometry.has_area() || host.rendered_opacity(candidate.editable) <= 0.0 {
            self.anchor = None;
            return self.pending_or_timeout(now);
        }
        if geometry.width < self.min_size.0 || geometry.height < self.min_size.1 {
            // Skeleton placeholder; not worth anchoring to.
            self.anchor = None;
            return self.pending_or_timeout(now);
        }

        match &mut self.anchor {
            Some(anchor)
                if anchor.candidate == candidate
                    && anchor.geometry.same_rect(&geometry, POSITION_TOLERANCE) =>
            {
                anchor.geometry = geometry;
                if now.duration_since(anchor.since) >= self.dwell {
                    tracing::debug!(
                        editable = anchor.candidate.editable,
                        action = anchor.candidate.action,
                        "composer geometry held still; accepting candidate"
                    );
                    return DetectOutcome::Found(candidate);
                }
            }
            _ => {
                self.anchor = Some(DwellAnchor {
                    candidate,
                    geometry,
                    since: now,
                });
            }
        }
        self.pending_or_timeout(now)
    }

    fn pending_or_timeout(&self, now: Instant) -> DetectOutcome {
        if now >= self.deadline {
            DetectOutcome::TimedOut
        } else {
            DetectOutcome::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPage;

    fn settings() -> Settings {
        Settings {
            detect_poll_ms: 100,
            detect_dwell_ms: 500,
            detect_timeout_ms: 5_000,
            ..Settings::default()
        }
    }

    fn pump(
        detector: &mut StabilityDetector,
        page: &SimPage,
        t0: Instant,
        from_ms: u64,
        to_ms: u64,
    ) -> Option<(DetectOutcome, u64)> {
        let mut at = from_ms;
        while at <= to_ms {
            let outcome = detector.poll(page, t0 + Duration::from_millis(at));
            if outcome != DetectOutcome::Pending {
                return Some((outcome, at));
            }
            at += 100;
        }
        None
    }

    #[test]
    fn skeleton_size_delays_acceptance() {
        let settings = settings();
        let mut page = SimPage::new();
        page.install_composer("Type a message", "Send message");
        page.set_composer_size(0.0, 0.0);
        let t0 = Instant::now();
        let mut detector = StabilityDetector::new(settings.candidate_query(), &settings, t0);

        // Two seconds of zero-size skeleton: nothing accepted.
        assert!(pump(&mut detector, &page, t0, 0, 2_000).is_none());

        page.set_composer_size(320.0, 48.0);
        let (outcome, at) = pump(&mut detector, &page, t0, 2_100, 3_000).unwrap();
        assert_eq!(outcome, DetectOutcome::Found(page.candidate().unwrap()));
        // Dwell of 500ms counted from the first full-size sample.
        assert!(at >= 2_600, "accepted too early at {at}ms");
    }

    #[test]
    fn movement_resets_the_dwell_clock() {
        let settings = settings();
        let mut page = SimPage::new();
        page.install_composer("Type a message", "Send message");
        let t0 = Instant::now();
        let mut detector = StabilityDetector::new(settings.candidate_query(), &settings, t0);

        assert!(pump(&mut detector, &page, t0, 0, 400).is_none());
        // Jump the composer 30px down at 400ms; dwell restarts there.
        page.move_composer(30.0);
        let (outcome, at) = pump(&mut detector, &page, t0, 500, 2_000).unwrap();
        assert!(matches!(outcome, DetectOutcome::Found(_)));
        assert!(at >= 900, "dwell clock was not reset, accepted at {at}ms");
    }

    #[test]
    fn no_candidate_times_out() {
        let settings = settings();
        let page = SimPage::new();
        let t0 = Instant::now();
        let mut detector = StabilityDetector::new(settings.candidate_query(), &settings, t0);
        let (outcome, _) = pump(&mut detector, &page, t0, 0, 5_100).unwrap();
        assert_eq!(outcome, DetectOutcome::TimedOut);
    }

    #[test]
    fn hidden_candidate_is_not_accepted() {
        let settings = settings();
        let mut page = SimPage::new();
        page.install_composer("Type a message", "Send message");
        page.set_composer_opacity(0.0);
        let t0 = Instant::now();
        let mut detector = StabilityDetector::new(settings.candidate_query(), &settings, t0);
        assert!(pump(&mut detector, &page, t0, 0, 1_500).is_none());
    }
}
