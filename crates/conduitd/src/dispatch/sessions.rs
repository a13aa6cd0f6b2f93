//! Register and Unregister handlers.

use conduit_protocol::split_fields;
use tracing::{info, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::router::Dispatcher;
use crate::evaluator::SessionBinding;
use crate::session::{RegistrationArgs, Session};

impl Dispatcher {
    /// Creates or replaces the session named in `payload`
    /// (`<id>` or `<id>\0<json argument array>`).
    pub(super) fn register(&self, payload: &str) -> Result<(), DispatchError> {
        let (id, argument_field) = split_fields(payload);
        let args = RegistrationArgs::decode(argument_field)
            .map_err(|source| DispatchError::argument_decode(id, source))?;

        let channel = match self.transport.open_point_to_point(id) {
            Ok(channel) => Some(channel),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    session = id,
                    error = %error,
                    "failed to open reverse channel; session will be reaped"
                );
                None
            }
        };

        let binding = SessionBinding {
            id,
            args: &args,
            channel: channel.as_ref(),
        };
        let environment = match self.host.create_environment(&binding) {
            Ok(environment) => environment,
            Err(error) => {
                if let Some(channel) = &channel {
                    channel.delete();
                }
                return Err(error.into());
            }
        };

        let console_mode = args.console_mode;
        let quiet = args.quiet;
        let session = Session::new(id, args, channel, environment);
        let replaced = self.registry.borrow_mut().insert(session);
        if let Some(previous) = &replaced {
            previous.close();
        }
        info!(
            target: DISPATCH_TARGET,
            session = id,
            console = %console_mode,
            quiet,
            replaced = replaced.is_some(),
            "session registered"
        );
        Ok(())
    }

    /// Removes the session whose bare identifier is `payload`.
    pub(super) fn unregister(&self, payload: &str) {
        let removed = self.registry.borrow_mut().remove(payload);
        match removed {
            Some(session) => {
                session.close();
                info!(target: DISPATCH_TARGET, session = payload, "session unregistered");
            }
            None => warn!(
                target: DISPATCH_TARGET,
                session = payload,
                "unregister for unknown session ignored"
            ),
        }
    }
}
