//! Request lifecycle of a search session
//!
//! A session moves through capture, processing, search and display one
//! request at a time. Every request gets a [`Ticket`]; a completion holding a
//! ticket that is no longer current belongs to a superseded request and is
//! rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Recording,
    Importing,
    Processing,
    Searching,
    Displaying,
}

/// Handle of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn number(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("request {ticket} was superseded by request {current}")]
    Stale { ticket: u64, current: u64 },

    #[error("cannot {action} while {status:?}")]
    InvalidState {
        status: SessionStatus,
        action: &'static str,
    },
}

/// Outcome of pressing the record control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPress {
    Started(Ticket),
    Cancelled,
}

#[derive(Debug)]
pub struct SearchSession {
    status: SessionStatus,
    request: u64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            request: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_request(&self) -> u64 {
        self.request
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.request
    }

    /// Start capturing from the microphone
    pub fn start_recording(&mut self) -> Result<Ticket, TransitionError> {
        self.start(SessionStatus::Recording, "start recording")
    }

    /// Start processing an imported file
    pub fn start_import(&mut self) -> Result<Ticket, TransitionError> {
        self.start(SessionStatus::Importing, "import audio")
    }

    /// Record control: starts a capture when idle, cancels one in progress
    pub fn press_record(&mut self) -> Result<RecordPress, TransitionError> {
        if self.status == SessionStatus::Recording {
            self.cancel();
            return Ok(RecordPress::Cancelled);
        }
        self.start_recording().map(RecordPress::Started)
    }

    /// Captured or imported audio is ready for analysis
    pub fn begin_processing(&mut self, ticket: Ticket) -> Result<(), TransitionError> {
        self.advance(
            ticket,
            &[SessionStatus::Recording, SessionStatus::Importing],
            SessionStatus::Processing,
            "process audio",
        )
    }

    /// A fingerprint is ready to be searched
    pub fn begin_search(&mut self, ticket: Ticket) -> Result<(), TransitionError> {
        self.advance(ticket, &[SessionStatus::Processing], SessionStatus::Searching, "search")
    }

    /// Results are ready. An empty fingerprint skips the search.
    pub fn display(&mut self, ticket: Ticket) -> Result<(), TransitionError> {
        self.advance(
            ticket,
            &[SessionStatus::Processing, SessionStatus::Searching],
            SessionStatus::Displaying,
            "display results",
        )
    }

    /// The request failed; go back to idle
    pub fn fail(&mut self, ticket: Ticket) -> Result<(), TransitionError> {
        self.check_ticket(ticket)?;
        self.status = SessionStatus::Idle;
        Ok(())
    }

    /// Leave the results screen
    pub fn dismiss(&mut self) -> Result<(), TransitionError> {
        if self.status != SessionStatus::Displaying {
            return Err(TransitionError::InvalidState {
                status: self.status,
                action: "dismiss results",
            });
        }
        self.status = SessionStatus::Idle;
        Ok(())
    }

    /// Abandon whatever is in flight. Pending completions become stale.
    pub fn cancel(&mut self) {
        self.request += 1;
        self.status = SessionStatus::Idle;
        log::debug!("Session cancelled, request counter at {}", self.request);
    }

    fn start(&mut self, next: SessionStatus, action: &'static str) -> Result<Ticket, TransitionError> {
        if self.status != SessionStatus::Idle {
            return Err(TransitionError::InvalidState {
                status: self.status,
                action,
            });
        }
        self.request += 1;
        self.status = next;
        Ok(Ticket(self.request))
    }

    fn advance(
        &mut self,
        ticket: Ticket,
        expected: &[SessionStatus],
        next: SessionStatus,
        action: &'static str,
    ) -> Result<(), TransitionError> {
        self.check_ticket(ticket)?;
        if !expected.contains(&self.status) {
            return Err(TransitionError::InvalidState {
                status: self.status,
                action,
            });
        }
        log::trace!("Request {}: {:?} -> {:?}", ticket.0, self.status, next);
        self.status = next;
        Ok(())
    }

    fn check_ticket(&self, ticket: Ticket) -> Result<(), TransitionError> {
        if ticket.0 != self.request {
            return Err(TransitionError::Stale {
                ticket: ticket.0,
                current: self.request,
            });
        }
        Ok(())
    }
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_request_cycle() {
        let mut session = SearchSession::new();

        let ticket = session.start_recording().unwrap();
        assert_eq!(session.status(), SessionStatus::Recording);

        session.begin_processing(ticket).unwrap();
        session.begin_search(ticket).unwrap();
        session.display(ticket).unwrap();
        assert_eq!(session.status(), SessionStatus::Displaying);

        session.dismiss().unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_request_numbers_increase() {
        let mut session = SearchSession::new();

        let first = session.start_import().unwrap();
        session.fail(first).unwrap();
        let second = session.start_import().unwrap();

        assert!(second.number() > first.number());
        assert!(session.is_current(second));
        assert!(!session.is_current(first));
    }

    #[test]
    fn test_second_press_cancels_recording() {
        let mut session = SearchSession::new();

        let ticket = match session.press_record().unwrap() {
            RecordPress::Started(ticket) => ticket,
            RecordPress::Cancelled => panic!("expected a new recording"),
        };
        assert_eq!(session.press_record().unwrap(), RecordPress::Cancelled);
        assert_eq!(session.status(), SessionStatus::Idle);

        // the capture finishing late is discarded
        assert_eq!(
            session.begin_processing(ticket),
            Err(TransitionError::Stale {
                ticket: ticket.number(),
                current: ticket.number() + 1
            })
        );
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_stale_completion_does_not_touch_new_request() {
        let mut session = SearchSession::new();

        let old = session.start_import().unwrap();
        session.cancel();
        let new = session.start_import().unwrap();
        session.begin_processing(new).unwrap();

        assert!(matches!(session.begin_search(old), Err(TransitionError::Stale { .. })));
        assert!(matches!(session.fail(old), Err(TransitionError::Stale { .. })));
        assert_eq!(session.status(), SessionStatus::Processing);
    }

    #[test]
    fn test_busy_session_rejects_new_capture() {
        let mut session = SearchSession::new();
        session.start_import().unwrap();

        assert_eq!(
            session.start_recording(),
            Err(TransitionError::InvalidState {
                status: SessionStatus::Importing,
                action: "start recording"
            })
        );
        assert!(matches!(session.press_record(), Err(TransitionError::InvalidState { .. })));
    }

    #[test]
    fn test_out_of_order_transition_rejected() {
        let mut session = SearchSession::new();
        let ticket = session.start_recording().unwrap();

        assert!(matches!(session.begin_search(ticket), Err(TransitionError::InvalidState { .. })));
        assert!(matches!(session.dismiss(), Err(TransitionError::InvalidState { .. })));
        assert_eq!(session.status(), SessionStatus::Recording);
    }

    #[test]
    fn test_empty_fingerprint_skips_search() {
        let mut session = SearchSession::new();
        let ticket = session.start_import().unwrap();

        session.begin_processing(ticket).unwrap();
        session.display(ticket).unwrap();
        assert_eq!(session.status(), SessionStatus::Displaying);
    }
}
