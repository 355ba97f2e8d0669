/// Error code registry for the allocation pipeline
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Market data errors
/// - 3000-3999: Graph construction errors
/// - 4000-4999: External service errors
/// - 5000-5999: Routing errors
/// - 6000-6999: Human input errors
/// - 7000-7999: Validation errors
/// - 9000-9999: Unsupported operations
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1003;

    // Market data errors (2000-2999)
    pub const DATA_GENERIC: u16 = 2000;
    pub const DATA_IO: u16 = 2001;
    pub const DATA_PARSE: u16 = 2002;
    pub const DATA_EMPTY: u16 = 2003;
    pub const DATA_BAD_PERIOD_LABEL: u16 = 2004;

    // Graph errors (3000-3999)
    pub const GRAPH_GENERIC: u16 = 3000;
    pub const GRAPH_UNKNOWN_NODE: u16 = 3001;
    pub const GRAPH_DUPLICATE_NODE: u16 = 3002;
    pub const GRAPH_DUPLICATE_ROUTER: u16 = 3003;
    pub const GRAPH_CYCLE: u16 = 3004;
    pub const GRAPH_UNREACHABLE: u16 = 3005;
    pub const GRAPH_CONFLICTING_WRITE: u16 = 3006;

    // External service errors (4000-4999)
    pub const EXTERNAL_GENERIC: u16 = 4000;
    pub const EXTERNAL_TIMEOUT: u16 = 4001;
    pub const EXTERNAL_MALFORMED: u16 = 4002;
    pub const EXTERNAL_NO_DATA: u16 = 4003;
    pub const EXTERNAL_CHANNEL_CLOSED: u16 = 4004;

    // Routing errors (5000-5999)
    pub const ROUTING_UNKNOWN_VERDICT: u16 = 5001;

    // Input errors (6000-6999)
    pub const INPUT_INVALID_TOKEN: u16 = 6001;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_OUT_OF_RANGE: u16 = 7001;
    pub const VALIDATION_SUM: u16 = 7002;
    pub const VALIDATION_MISSING_FIELD: u16 = 7003;
    pub const VALIDATION_ALREADY_SET: u16 = 7004;

    // Unsupported (9000-9999)
    pub const UNSUPPORTED_RETRY: u16 = 9001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Failed to parse configuration",
        1003 => "Invalid value in configuration",

        2000 => "Generic market data error",
        2001 => "Market data I/O error",
        2002 => "Failed to parse market data",
        2003 => "Market data contains no periods",
        2004 => "Period label is not in 'Month YYYY' form",

        3000 => "Generic graph error",
        3001 => "Edge references an unregistered node",
        3002 => "Node registered twice",
        3003 => "More than one conditional edge on a node",
        3004 => "Graph contains a cycle",
        3005 => "Node is not reachable from start or cannot reach end",
        3006 => "Two steps wrote the same field in one superstep",

        4000 => "Generic external service error",
        4001 => "External call timed out",
        4002 => "External service returned malformed output",
        4003 => "No data available for the requested period",
        4004 => "Decision channel closed",

        5001 => "Risk verdict does not match any branch",

        6001 => "Invalid decision token",

        7000 => "Generic validation error",
        7001 => "Allocation outside [0, 1]",
        7002 => "Equities and bonds do not sum to one",
        7003 => "Required field is absent",
        7004 => "Field already written in this pass",

        9001 => "Retry on try-again is not supported",

        _ => "Unknown error code",
    }
}
