//! Pure routing of `rumqttc` event-loop results
//!
//! Each poll result is mapped to an [`EventRoute`] which the delivery task
//! turns into a coordinator callback.

use super::coordinator::DisconnectReason;
use rumqttc::{ConnectReturnCode, ConnectionError, Event, Outgoing, Packet};

/// Routing decisions for MQTT event-loop results
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// CONNACK received, or the broker refused the connection
    ConnectResult(ConnectReturnCode),
    /// A publish packet was written to the network
    PublishSent,
    /// The session ended
    Disconnected(DisconnectReason),
    /// Transport failure without a CONNACK code
    TransportError(String),
    /// Pings and other traffic with no lifecycle meaning
    InfrastructureEvent(String),
}

impl EventRoute {
    /// Whether the delivery task keeps polling after this route.
    ///
    /// Anything that ends or prevents the session stops the loop, since the
    /// client does not reconnect.
    pub fn continues_session(&self) -> bool {
        match self {
            EventRoute::ConnectResult(code) => *code == ConnectReturnCode::Success,
            EventRoute::PublishSent | EventRoute::InfrastructureEvent(_) => true,
            EventRoute::Disconnected(_) | EventRoute::TransportError(_) => false,
        }
    }
}

pub struct MessageHandler;

impl MessageHandler {
    /// Route one event-loop poll result (pure function)
    pub fn route_poll_result(result: &Result<Event, ConnectionError>) -> EventRoute {
        match result {
            Ok(event) => Self::route_mqtt_event(event),
            Err(ConnectionError::ConnectionRefused(code)) => EventRoute::ConnectResult(*code),
            Err(error) => EventRoute::TransportError(error.to_string()),
        }
    }

    /// Route a successfully polled event (pure function)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(Packet::ConnAck(connack)) => EventRoute::ConnectResult(connack.code),
            Event::Incoming(Packet::Disconnect) => {
                EventRoute::Disconnected(DisconnectReason::ByBroker)
            }
            Event::Incoming(other) => EventRoute::InfrastructureEvent(format!("{other:?}")),
            Event::Outgoing(Outgoing::Publish(_)) => EventRoute::PublishSent,
            Event::Outgoing(Outgoing::Disconnect) => {
                EventRoute::Disconnected(DisconnectReason::Requested)
            }
            Event::Outgoing(other) => EventRoute::InfrastructureEvent(format!("{other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::ConnAck;

    #[test]
    fn test_route_successful_connack() {
        let event = Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::Success,
            false,
        )));

        let route = MessageHandler::route_mqtt_event(&event);

        assert_eq!(route, EventRoute::ConnectResult(ConnectReturnCode::Success));
        assert!(route.continues_session());
    }

    #[test]
    fn test_route_refused_connection() {
        let result = Err(ConnectionError::ConnectionRefused(
            ConnectReturnCode::BadUserNamePassword,
        ));

        let route = MessageHandler::route_poll_result(&result);

        assert_eq!(
            route,
            EventRoute::ConnectResult(ConnectReturnCode::BadUserNamePassword)
        );
        assert!(!route.continues_session());
    }

    #[test]
    fn test_route_io_error_as_transport_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let result = Err(ConnectionError::Io(io));

        let route = MessageHandler::route_poll_result(&result);

        assert!(matches!(route, EventRoute::TransportError(ref msg) if msg.contains("refused")));
        assert!(!route.continues_session());
    }

    #[test]
    fn test_route_outgoing_publish() {
        let route = MessageHandler::route_mqtt_event(&Event::Outgoing(Outgoing::Publish(0)));
        assert_eq!(route, EventRoute::PublishSent);
        assert!(route.continues_session());
    }

    #[test]
    fn test_route_disconnects() {
        let requested = MessageHandler::route_mqtt_event(&Event::Outgoing(Outgoing::Disconnect));
        assert_eq!(
            requested,
            EventRoute::Disconnected(DisconnectReason::Requested)
        );
        assert!(!requested.continues_session());

        let by_broker = MessageHandler::route_mqtt_event(&Event::Incoming(Packet::Disconnect));
        assert_eq!(
            by_broker,
            EventRoute::Disconnected(DisconnectReason::ByBroker)
        );
    }

    #[test]
    fn test_route_ping_as_infrastructure() {
        let route = MessageHandler::route_mqtt_event(&Event::Outgoing(Outgoing::PingReq));
        assert!(matches!(route, EventRoute::InfrastructureEvent(_)));
        assert!(route.continues_session());

        let route = MessageHandler::route_mqtt_event(&Event::Incoming(Packet::PingResp));
        assert!(matches!(route, EventRoute::InfrastructureEvent(_)));
    }
}
