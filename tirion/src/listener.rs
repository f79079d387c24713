use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::framing::FramedReceiver;
use crate::ClientError;

/// Handles commands sent by the agent.
///
/// A command is one selector character followed by a payload. Return
/// `false` for commands the handler does not know; they are logged and the
/// listener keeps going.
pub trait CommandHandler: Send + 'static {
    fn handle(&mut self, command: char, payload: &str) -> bool;
}

/// Handler that understands no command.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownCommands;

impl CommandHandler for UnknownCommands {
    fn handle(&mut self, _command: char, _payload: &str) -> bool {
        false
    }
}

/// Clears the flag when dropped, including while unwinding out of a
/// panicking handler.
struct StopOnExit(Arc<AtomicBool>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reads agent commands until the stream fails or ends, then clears
/// `running`. Closing the socket is the only way to stop it.
pub fn command_listener_thread<R: Read>(
    mut receiver: FramedReceiver<R>,
    running: Arc<AtomicBool>,
    mut handler: Box<dyn CommandHandler>,
) {
    let _stop = StopOnExit(running.clone());
    debug!("start listening to commands");

    while running.load(Ordering::Acquire) {
        match receiver.receive() {
            Ok(line) => dispatch(&line, handler.as_mut()),
            Err(ClientError::EndOfStream) => {
                debug!("unix socket got closed");
                break;
            }
            Err(e) => {
                if running.load(Ordering::Acquire) {
                    warn!(error = %e, "unix socket error");
                } else {
                    debug!(error = %e, "unix socket closed while stopping");
                }
                break;
            }
        }
    }

    debug!("stop listening to commands");
}

fn dispatch(line: &str, handler: &mut dyn CommandHandler) {
    let Some((command, payload)) = protocol::split_command(line) else {
        return;
    };

    if !handler.handle(command, payload) {
        warn!(%command, "unknown command");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::{self, Cursor, ErrorKind};

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<(char, String)>>>,
    }

    impl CommandHandler for Recorder {
        fn handle(&mut self, command: char, payload: &str) -> bool {
            self.seen.lock().push((command, payload.to_string()));
            command == 'x'
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::ConnectionReset))
        }
    }

    #[test]
    fn test_dispatches_in_stream_order() {
        let recorder = Recorder::default();
        let receiver = FramedReceiver::new(Cursor::new(b"xone\nytwo\nx\n".to_vec()), 4096);
        let running = Arc::new(AtomicBool::new(true));

        command_listener_thread(receiver, running.clone(), Box::new(recorder.clone()));

        assert_eq!(
            *recorder.seen.lock(),
            vec![
                ('x', "one".to_string()),
                ('y', "two".to_string()),
                ('x', String::new()),
            ]
        );
        assert!(!running.load(Ordering::Acquire));
    }

    #[test]
    fn test_unknown_commands_keep_listening() {
        let recorder = Recorder::default();
        let receiver = FramedReceiver::new(Cursor::new(b"zzz\nqq\nxlast\n".to_vec()), 4096);
        let running = Arc::new(AtomicBool::new(true));

        command_listener_thread(receiver, running.clone(), Box::new(recorder.clone()));

        assert_eq!(recorder.seen.lock().len(), 3);
        assert_eq!(recorder.seen.lock()[2], ('x', "last".to_string()));
    }

    #[test]
    fn test_stream_error_stops_listener() {
        let running = Arc::new(AtomicBool::new(true));

        command_listener_thread(
            FramedReceiver::new(FailingReader, 4096),
            running.clone(),
            Box::new(UnknownCommands),
        );

        assert!(!running.load(Ordering::Acquire));
    }

    struct Panicking;

    impl CommandHandler for Panicking {
        fn handle(&mut self, _command: char, _payload: &str) -> bool {
            panic!("handler failed");
        }
    }

    #[test]
    fn test_panicking_handler_clears_running() {
        let receiver = FramedReceiver::new(Cursor::new(b"xboom\n".to_vec()), 4096);
        let running = Arc::new(AtomicBool::new(true));

        let listener = {
            let running = running.clone();
            std::thread::spawn(move || {
                command_listener_thread(receiver, running, Box::new(Panicking))
            })
        };

        assert!(listener.join().is_err());
        assert!(!running.load(Ordering::Acquire));
    }

    #[test]
    fn test_not_running_skips_receive() {
        let recorder = Recorder::default();
        let receiver = FramedReceiver::new(Cursor::new(b"xone\n".to_vec()), 4096);
        let running = Arc::new(AtomicBool::new(false));

        command_listener_thread(receiver, running.clone(), Box::new(recorder.clone()));

        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn test_unknown_commands_handler() {
        assert!(!UnknownCommands.handle('a', "payload"));
    }
}
