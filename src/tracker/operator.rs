use tokio::sync::watch;

use crate::telemetry::OperatorId;

/// Operator id of the running session, shared between the controller and the
/// background fix handler. `None` while idle.
pub fn operator_cell() -> (OperatorWriter, OperatorReader) {
    let (tx, rx) = watch::channel(None);
    (OperatorWriter(tx), OperatorReader(rx))
}

/// Held only by the tracking controller.
#[derive(Debug)]
pub struct OperatorWriter(watch::Sender<Option<OperatorId>>);

impl OperatorWriter {
    pub fn set(&self, operator_id: OperatorId) {
        self.0.send_replace(Some(operator_id));
    }

    pub fn clear(&self) -> Option<OperatorId> {
        self.0.send_replace(None)
    }
}

#[derive(Debug, Clone)]
pub struct OperatorReader(watch::Receiver<Option<OperatorId>>);

impl OperatorReader {
    pub fn current(&self) -> Option<OperatorId> {
        self.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_sees_writes() {
        let (writer, reader) = operator_cell();
        assert_eq!(reader.current(), None);

        writer.set(OperatorId::new("BUS7").unwrap());
        assert_eq!(reader.current().unwrap().as_str(), "BUS7");
        assert_eq!(reader.clone().current().unwrap().as_str(), "BUS7");

        assert_eq!(writer.clear().unwrap().as_str(), "BUS7");
        assert_eq!(reader.current(), None);
    }

    #[test]
    fn writes_survive_without_readers() {
        let (writer, reader) = operator_cell();
        drop(reader);
        writer.set(OperatorId::new("BUS9").unwrap());
        assert_eq!(writer.clear().unwrap().as_str(), "BUS9");
    }
}
