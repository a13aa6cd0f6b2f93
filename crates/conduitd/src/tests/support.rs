//! Shared doubles for host tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use conduit_protocol::{MessageTag, join_fields};

use crate::channel::{Channel, ChannelError, Transport};
use crate::console::OutputSink;
use crate::dispatch::{DispatchError, Dispatcher};

/// Channel that records every message it is asked to deliver.
#[derive(Debug)]
pub(crate) struct RecordingChannel {
    sent: RefCell<Vec<(MessageTag, String)>>,
    valid: Cell<bool>,
    deleted: Cell<bool>,
}

impl RecordingChannel {
    fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            valid: Cell::new(true),
            deleted: Cell::new(false),
        }
    }

    pub(crate) fn sent(&self) -> Vec<(MessageTag, String)> {
        self.sent.borrow().clone()
    }

    pub(crate) fn sent_with(&self, tag: MessageTag) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .filter(|(sent_tag, _)| *sent_tag == tag)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Simulates the client going away.
    pub(crate) fn hang_up(&self) {
        self.valid.set(false);
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.get()
    }
}

impl Channel for RecordingChannel {
    fn send(&self, payload: &str, tag: MessageTag) -> Result<(), ChannelError> {
        if self.deleted.get() || !self.valid.get() {
            return Err(ChannelError::Closed);
        }
        self.sent.borrow_mut().push((tag, payload.to_owned()));
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.valid.get() && !self.deleted.get()
    }

    fn delete(&self) {
        self.deleted.set(true);
    }
}

/// Transport handing out [`RecordingChannel`]s and remembering them.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingTransport {
    opened: Rc<RefCell<Vec<(String, Rc<RecordingChannel>)>>>,
    refused: Rc<RefCell<Vec<String>>>,
}

impl RecordingTransport {
    /// Makes future opens for `id` fail.
    pub(crate) fn refuse(&self, id: &str) {
        self.refused.borrow_mut().push(id.to_owned());
    }

    /// Every channel opened for `id`, oldest first.
    pub(crate) fn channels_for(&self, id: &str) -> Vec<Rc<RecordingChannel>> {
        self.opened
            .borrow()
            .iter()
            .filter(|(opened_id, _)| opened_id == id)
            .map(|(_, channel)| Rc::clone(channel))
            .collect()
    }

    pub(crate) fn latest(&self, id: &str) -> Rc<RecordingChannel> {
        self.channels_for(id)
            .pop()
            .unwrap_or_else(|| panic!("no channel opened for {id}"))
    }
}

impl Transport for RecordingTransport {
    fn open_point_to_point(&self, id: &str) -> Result<Rc<dyn Channel>, ChannelError> {
        if self.refused.borrow().iter().any(|refused| refused == id) {
            return Err(ChannelError::Unsupported);
        }
        let channel = Rc::new(RecordingChannel::new());
        self.opened
            .borrow_mut()
            .push((id.to_owned(), Rc::clone(&channel)));
        Ok(channel)
    }
}

/// Host console double.
#[derive(Debug, Default)]
pub(crate) struct ConsoleLines(RefCell<Vec<String>>);

impl ConsoleLines {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl OutputSink for ConsoleLines {
    fn emit(&self, line: &str) {
        self.0.borrow_mut().push(line.to_owned());
    }
}

/// A dispatcher wired to recording doubles.
pub(crate) struct HostHarness {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) transport: RecordingTransport,
    pub(crate) console: Rc<ConsoleLines>,
}

impl HostHarness {
    pub(crate) fn new() -> Self {
        let transport = RecordingTransport::default();
        let console = Rc::new(ConsoleLines::default());
        let dispatcher = Dispatcher::assemble(
            Rc::clone(&console) as Rc<dyn OutputSink>,
            Box::new(transport.clone()),
            None,
        )
        .expect("assemble host");
        Self {
            dispatcher,
            transport,
            console,
        }
    }

    pub(crate) fn dispatch(
        &self,
        tag: MessageTag,
        payload: &str,
    ) -> Result<Option<String>, DispatchError> {
        self.dispatcher.dispatch(tag.code(), payload)
    }

    pub(crate) fn register(&self, id: &str, args: &[&str]) {
        let json = serde_json::to_string(args).expect("encode arguments");
        let reply = self
            .dispatch(MessageTag::Register, &join_fields(id, &json))
            .expect("register");
        assert_eq!(reply, None, "register produces no reply");
    }

    pub(crate) fn unregister(&self, id: &str) {
        let reply = self
            .dispatch(MessageTag::Unregister, id)
            .expect("unregister");
        assert_eq!(reply, None, "unregister produces no reply");
    }

    pub(crate) fn command(&self, id: &str, code: &str) -> Option<String> {
        self.dispatch(MessageTag::Command, &join_fields(id, code))
            .expect("command")
    }

    pub(crate) fn query(&self, id: &str, code: &str) -> Option<String> {
        self.dispatch(MessageTag::Query, &join_fields(id, code))
            .expect("query")
    }

    pub(crate) fn legacy(&self, code: &str) -> Option<String> {
        self.dispatch(MessageTag::Legacy, &format!("x{code}"))
            .expect("legacy")
    }

    pub(crate) fn session_count(&self) -> usize {
        self.dispatcher.registry().borrow().len()
    }

    pub(crate) fn has_session(&self, id: &str) -> bool {
        self.dispatcher.registry().borrow().contains(id)
    }
}
