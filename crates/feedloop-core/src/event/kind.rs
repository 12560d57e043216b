use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Real-time event types a listener can handle, one listener method each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    MessageSent,
    SharedPost,
    InstantMessageCreated,
    RoomCreated,
    RoomUpdated,
    RoomDeactivated,
    RoomReactivated,
    UserRequestedToJoinRoom,
    UserJoinedRoom,
    UserLeftRoom,
    RoomMemberPromotedToOwner,
    RoomMemberDemotedFromOwner,
    ConnectionRequested,
    ConnectionAccepted,
    SymphonyElementsAction,
    MessageSuppressed,
}

impl EventType {
    pub const ALL: [EventType; 16] = [
        EventType::MessageSent,
        EventType::SharedPost,
        EventType::InstantMessageCreated,
        EventType::RoomCreated,
        EventType::RoomUpdated,
        EventType::RoomDeactivated,
        EventType::RoomReactivated,
        EventType::UserRequestedToJoinRoom,
        EventType::UserJoinedRoom,
        EventType::UserLeftRoom,
        EventType::RoomMemberPromotedToOwner,
        EventType::RoomMemberDemotedFromOwner,
        EventType::ConnectionRequested,
        EventType::ConnectionAccepted,
        EventType::SymphonyElementsAction,
        EventType::MessageSuppressed,
    ];

    /// Value of the `type` field on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::MessageSent => "MESSAGESENT",
            EventType::SharedPost => "SHAREDPOST",
            EventType::InstantMessageCreated => "INSTANTMESSAGECREATED",
            EventType::RoomCreated => "ROOMCREATED",
            EventType::RoomUpdated => "ROOMUPDATED",
            EventType::RoomDeactivated => "ROOMDEACTIVATED",
            EventType::RoomReactivated => "ROOMREACTIVATED",
            EventType::UserRequestedToJoinRoom => "USERREQUESTEDTOJOINROOM",
            EventType::UserJoinedRoom => "USERJOINEDROOM",
            EventType::UserLeftRoom => "USERLEFTROOM",
            EventType::RoomMemberPromotedToOwner => "ROOMMEMBERPROMOTEDTOOWNER",
            EventType::RoomMemberDemotedFromOwner => "ROOMMEMBERDEMOTEDFROMOWNER",
            EventType::ConnectionRequested => "CONNECTIONREQUESTED",
            EventType::ConnectionAccepted => "CONNECTIONACCEPTED",
            EventType::SymphonyElementsAction => "SYMPHONYELEMENTSACTION",
            EventType::MessageSuppressed => "MESSAGESUPPRESSED",
        }
    }

    /// Name of the payload field holding this event's body.
    pub fn payload_field(self) -> &'static str {
        match self {
            EventType::MessageSent => "messageSent",
            EventType::SharedPost => "sharedPost",
            EventType::InstantMessageCreated => "instantMessageCreated",
            EventType::RoomCreated => "roomCreated",
            EventType::RoomUpdated => "roomUpdated",
            EventType::RoomDeactivated => "roomDeactivated",
            EventType::RoomReactivated => "roomReactivated",
            EventType::UserRequestedToJoinRoom => "userRequestedToJoinRoom",
            EventType::UserJoinedRoom => "userJoinedRoom",
            EventType::UserLeftRoom => "userLeftRoom",
            EventType::RoomMemberPromotedToOwner => "roomMemberPromotedToOwner",
            EventType::RoomMemberDemotedFromOwner => "roomMemberDemotedFromOwner",
            EventType::ConnectionRequested => "connectionRequested",
            EventType::ConnectionAccepted => "connectionAccepted",
            EventType::SymphonyElementsAction => "symphonyElementsAction",
            EventType::MessageSuppressed => "messageSuppressed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when the wire `type` is not one of the known event types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}
