//! Schema enums for the Tell collector protocol
//!
//! These mirror the FlatBuffers schema definitions and are written as raw
//! bytes into the wire format. They must stay in sync with the collector.

/// Schema type carried on the outer Batch (selects EventData vs LogData)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SchemaType {
    /// Default value (never sent in practice)
    Unknown = 0,
    /// Product analytics events
    Event = 1,
    /// Structured logs
    Log = 2,
}

impl SchemaType {
    /// Parse schema type from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Event,
            2 => Self::Log,
            _ => Self::Unknown,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the string name of this schema type
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Event => "event",
            Self::Log => "log",
        }
    }
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event type for analytics events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Unknown = 0,
    Track = 1,
    Identify = 2,
    Group = 3,
    Alias = 4,
    /// Reserved by the wire schema; not emitted by the ingress API
    Enrich = 5,
    /// Reserved by the wire schema; not emitted by the ingress API
    Context = 6,
}

impl EventType {
    /// Parse from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Track,
            2 => Self::Identify,
            3 => Self::Group,
            4 => Self::Alias,
            5 => Self::Enrich,
            6 => Self::Context,
            _ => Self::Unknown,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get string representation
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Track => "track",
            Self::Identify => "identify",
            Self::Group => "group",
            Self::Alias => "alias",
            Self::Enrich => "enrich",
            Self::Context => "context",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for EventType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Log event type carried on every LogEntry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogEventType {
    Unknown = 0,
    Log = 1,
    Enrich = 2,
}

impl LogEventType {
    /// Parse from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Log,
            2 => Self::Enrich,
            _ => Self::Unknown,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Default for LogEventType {
    fn default() -> Self {
        Self::Log
    }
}

/// Log severity - RFC 5424 levels plus Trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
    Trace = 8,
}

impl LogLevel {
    /// Parse from raw byte value; out-of-range values fall back to Info
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Emergency,
            1 => Self::Alert,
            2 => Self::Critical,
            3 => Self::Error,
            4 => Self::Warning,
            5 => Self::Notice,
            6 => Self::Info,
            7 => Self::Debug,
            8 => Self::Trace,
            _ => Self::Info,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the string name of this level
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}
