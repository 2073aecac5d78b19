//! SlimeVR UDP packet encoding.
//!
//! Every packet starts with a common 12-byte header:
//!
//! ```text
//! [0-3]   packet type, u32 little-endian
//! [4-11]  sequence number, u64 little-endian
//! ```
//!
//! followed by the type-specific payload.

/// Common header length in bytes.
pub const HEADER_LEN: usize = 12;

/// Handshake payload length (board, IMU, MCU, IMU info, firmware, build, MAC).
pub const HANDSHAKE_PAYLOAD_LEN: usize = 46;

/// Orientation payload length (sensor id, data type, quaternion, accuracy).
pub const ORIENTATION_PAYLOAD_LEN: usize = 19;

/// Battery payload length (voltage, level).
pub const BATTERY_PAYLOAD_LEN: usize = 8;

/// Board type reported in handshakes (custom board).
pub const BOARD_TYPE_CUSTOM: u32 = 100;

/// IMU type reported in handshakes (ICM-42688).
pub const IMU_TYPE_ICM42688: u32 = 3;

/// MCU type reported in handshakes (custom MCU).
pub const MCU_TYPE_CUSTOM: u32 = 100;

/// Firmware version reported in handshakes.
pub const FIRMWARE_VERSION: [u32; 3] = [1, 0, 0];

/// Firmware build number reported in handshakes.
pub const FIRMWARE_BUILD: u32 = 1;

/// Fixed prefix of the synthetic hardware address; the last byte is the tracker id.
pub const MAC_PREFIX: [u8; 5] = [0x01, 0x02, 0x03, 0x04, 0x05];

/// Rotation data type marker for a normal rotation.
pub const DATA_TYPE_NORMAL: u8 = 1;

/// Accuracy marker for high accuracy.
pub const ACCURACY_HIGH: u8 = 1;

/// Battery voltage at 0%.
pub const BATTERY_EMPTY_VOLTS: f64 = 3.3;

/// Voltage span between 0% and 100%.
pub const BATTERY_RANGE_VOLTS: f64 = 0.9;

/// SlimeVR packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PacketType {
    Heartbeat = 0,
    Rotation = 1,
    Gyroscope = 2,
    Handshake = 3,
    Accel = 4,
    Ping = 10,
    Pong = 11,
    Battery = 12,
    Tap = 13,
    ResetReason = 14,
    SensorInfo = 15,
    Rotation2 = 16,
    RotationData = 17,
    MagnetometerAccuracy = 18,
    SignalStrength = 19,
    Temperature = 20,
    FeatureFlags = 22,
    Bundle = 100,
}

impl PacketType {
    /// Wire tag for this packet type.
    pub fn tag(&self) -> u32 {
        *self as u32
    }

    /// Look up a packet type by wire tag.
    pub fn from_tag(tag: u32) -> Option<Self> {
        let packet_type = match tag {
            0 => PacketType::Heartbeat,
            1 => PacketType::Rotation,
            2 => PacketType::Gyroscope,
            3 => PacketType::Handshake,
            4 => PacketType::Accel,
            10 => PacketType::Ping,
            11 => PacketType::Pong,
            12 => PacketType::Battery,
            13 => PacketType::Tap,
            14 => PacketType::ResetReason,
            15 => PacketType::SensorInfo,
            16 => PacketType::Rotation2,
            17 => PacketType::RotationData,
            18 => PacketType::MagnetometerAccuracy,
            19 => PacketType::SignalStrength,
            20 => PacketType::Temperature,
            22 => PacketType::FeatureFlags,
            100 => PacketType::Bundle,
            _ => return None,
        };
        Some(packet_type)
    }

    /// Payload length for the packet types this bridge emits.
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            PacketType::Heartbeat => Some(0),
            PacketType::Handshake => Some(HANDSHAKE_PAYLOAD_LEN),
            PacketType::RotationData => Some(ORIENTATION_PAYLOAD_LEN),
            PacketType::Battery => Some(BATTERY_PAYLOAD_LEN),
            _ => None,
        }
    }
}

/// Common header of an outbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Raw packet type tag
    pub tag: u32,
    /// Sequence number
    pub sequence: u64,
}

impl PacketHeader {
    /// Parse the common header from the start of a packet.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }

        let tag = u32::from_le_bytes(bytes[0..4].try_into().ok()?);
        let sequence = u64::from_le_bytes(bytes[4..12].try_into().ok()?);

        Some(Self { tag, sequence })
    }

    /// Packet type if the tag is known.
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_tag(self.tag)
    }
}

/// An encoded packet ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    packet_type: PacketType,
    sequence: u64,
    bytes: Vec<u8>,
}

impl OutboundPacket {
    /// Packet type.
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Sequence number stamped in the header.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload after the common header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    /// Total encoded length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the packet has no bytes (never true for encoded packets).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the packet and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Encodes SlimeVR packets and owns the outbound sequence counter.
///
/// The counter starts at 0, advances by one per encoded packet of any type and
/// wraps at `u64::MAX`.
#[derive(Debug, Default)]
pub struct PacketEncoder {
    next_sequence: u64,
}

impl PacketEncoder {
    /// Create an encoder starting at sequence 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder starting at an arbitrary sequence number.
    pub fn starting_at(sequence: u64) -> Self {
        Self {
            next_sequence: sequence,
        }
    }

    /// Sequence number the next packet will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Encode the one-time introduction packet for a tracker.
    pub fn encode_handshake(&mut self, tracker_id: u8) -> OutboundPacket {
        let mut packet = self.begin(PacketType::Handshake);

        put_u32(&mut packet, BOARD_TYPE_CUSTOM);
        put_u32(&mut packet, IMU_TYPE_ICM42688);
        put_u32(&mut packet, MCU_TYPE_CUSTOM);

        // IMU info
        for _ in 0..3 {
            put_u32(&mut packet, 0);
        }

        for part in FIRMWARE_VERSION {
            put_u32(&mut packet, part);
        }
        put_u32(&mut packet, FIRMWARE_BUILD);

        packet.bytes.extend_from_slice(&MAC_PREFIX);
        packet.bytes.push(tracker_id);

        packet
    }

    /// Encode a rotation packet. `quaternion` is in w, x, y, z order.
    pub fn encode_orientation(&mut self, tracker_id: u8, quaternion: [f32; 4]) -> OutboundPacket {
        let mut packet = self.begin(PacketType::RotationData);

        packet.bytes.push(tracker_id);
        packet.bytes.push(DATA_TYPE_NORMAL);
        for component in quaternion {
            put_f32(&mut packet, component);
        }
        packet.bytes.push(ACCURACY_HIGH);

        packet
    }

    /// Encode a battery packet with an estimated voltage.
    ///
    /// The battery payload has no sensor field, so `tracker_id` is only traced.
    pub fn encode_battery(&mut self, tracker_id: u8, battery_pct: u8) -> OutboundPacket {
        let mut packet = self.begin(PacketType::Battery);
        tracing::trace!("Battery for tracker #{}: {}%", tracker_id, battery_pct);

        let (voltage, level) = battery_fields(battery_pct);
        put_f32(&mut packet, voltage);
        put_f32(&mut packet, level);

        packet
    }

    /// Encode a keep-alive packet.
    pub fn encode_heartbeat(&mut self) -> OutboundPacket {
        self.begin(PacketType::Heartbeat)
    }

    fn begin(&mut self, packet_type: PacketType) -> OutboundPacket {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let capacity = HEADER_LEN + packet_type.payload_len().unwrap_or(0);
        let mut bytes = Vec::with_capacity(capacity);
        bytes.extend_from_slice(&packet_type.tag().to_le_bytes());
        bytes.extend_from_slice(&sequence.to_le_bytes());

        OutboundPacket {
            packet_type,
            sequence,
            bytes,
        }
    }
}

/// Voltage and fractional level for a battery percentage.
///
/// Maps 0-100% linearly onto 3.3-4.2 V. Computed in f64 and narrowed once,
/// so the wire value is the nearest f32 to the exact voltage.
pub fn battery_fields(battery_pct: u8) -> (f32, f32) {
    let level = f64::from(battery_pct) / 100.0;
    (
        (BATTERY_EMPTY_VOLTS + level * BATTERY_RANGE_VOLTS) as f32,
        level as f32,
    )
}

fn put_u32(packet: &mut OutboundPacket, value: u32) {
    packet.bytes.extend_from_slice(&value.to_le_bytes());
}

fn put_f32(packet: &mut OutboundPacket, value: f32) {
    packet.bytes.extend_from_slice(&value.to_le_bytes());
}
