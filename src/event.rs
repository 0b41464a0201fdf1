use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Shell input events
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
  /// One line of input, without the trailing newline
  Line(String),
  /// Input closed (Ctrl-D or end of piped input)
  Closed,
}

/// Event handler that produces events from line-oriented input
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Read lines from standard input
  pub fn stdin() -> Self {
    Self::from_reader(BufReader::new(tokio::io::stdin()))
  }

  /// Read lines from any buffered reader
  pub fn from_reader<R>(reader: R) -> Self
  where
    R: AsyncBufRead + Unpin + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn input reader
    tokio::spawn(async move {
      let mut lines = reader.lines();
      loop {
        match lines.next_line().await {
          Ok(Some(line)) => {
            if tx.send(Event::Line(line)).is_err() {
              break;
            }
          }
          Ok(None) | Err(_) => {
            let _ = tx.send(Event::Closed);
            break;
          }
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event; `Closed` once input is exhausted
  pub async fn next(&mut self) -> Event {
    self.rx.recv().await.unwrap_or(Event::Closed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_lines_then_closed() {
    let mut events = EventHandler::from_reader(BufReader::new(&b"products\norders list\n"[..]));

    assert_eq!(events.next().await, Event::Line("products".into()));
    assert_eq!(events.next().await, Event::Line("orders list".into()));
    assert_eq!(events.next().await, Event::Closed);
    assert_eq!(events.next().await, Event::Closed);
  }
}
