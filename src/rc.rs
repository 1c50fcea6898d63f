//! STAF return codes
//!
//! Static table of the framework's return codes (`STAFError.h`), with a
//! symbolic name and a description for each. Codes are dense from 0, so the
//! table is indexed directly by code.

/// A native return code
pub type Rc = u32;

/// Description returned by [`strerror`] for codes outside the table.
pub const UNKNOWN_RC_DESCRIPTION: &str = "Unknown return code";

/// A return-code table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcInfo {
    pub code: Rc,
    pub name: &'static str,
    pub description: &'static str,
}

macro_rules! return_codes {
    ($($konst:ident = $code:literal, $name:literal, $desc:literal;)*) => {
        $(
            #[doc = $desc]
            pub const $konst: Rc = $code;
        )*

        static TABLE: &[RcInfo] = &[
            $(RcInfo { code: $code, name: $name, description: $desc },)*
        ];
    };
}

return_codes! {
    OK = 0, "Ok", "No error";
    INVALID_API = 1, "InvalidAPI", "Invalid API";
    UNKNOWN_SERVICE = 2, "UnknownService", "Unknown service";
    INVALID_HANDLE = 3, "InvalidHandle", "Invalid handle";
    HANDLE_ALREADY_EXISTS = 4, "HandleAlreadyExists", "Handle already exists";
    HANDLE_DOES_NOT_EXIST = 5, "HandleDoesNotExist", "Handle does not exist";
    UNKNOWN_ERROR = 6, "UnknownError", "Unknown error";
    INVALID_REQUEST_STRING = 7, "InvalidRequestString", "Invalid request string";
    INVALID_SERVICE_RESULT = 8, "InvalidServiceResult", "Invalid service result";
    REXX_ERROR = 9, "REXXError", "REXX Error";
    BASE_OS_ERROR = 10, "BaseOSError", "Base operating system error";
    PROCESS_ALREADY_COMPLETE = 11, "ProcessAlreadyComplete", "Process already complete";
    PROCESS_NOT_COMPLETE = 12, "ProcessNotComplete", "Process not complete";
    VARIABLE_DOES_NOT_EXIST = 13, "VariableDoesNotExist", "Variable does not exist";
    UNRESOLVABLE_STRING = 14, "UnResolvableString", "Unresolvable string";
    INVALID_RESOLVE_STRING = 15, "InvalidResolveString", "Invalid resolve string";
    NO_PATH_TO_MACHINE = 16, "NoPathToMachine", "No path to endpoint";
    FILE_OPEN_ERROR = 17, "FileOpenError", "File open error";
    FILE_READ_ERROR = 18, "FileReadError", "File read error";
    FILE_WRITE_ERROR = 19, "FileWriteError", "File write error";
    FILE_DELETE_ERROR = 20, "FileDeleteError", "File delete error";
    STAF_NOT_RUNNING = 21, "STAFNotRunning", "STAF not running";
    COMMUNICATION_ERROR = 22, "CommunicationError", "Communication error";
    TRUSTEE_DOES_NOT_EXIST = 23, "TrusteeDoesNotExist", "Trustee does not exist";
    INVALID_TRUST_LEVEL = 24, "InvalidTrustLevel", "Invalid trust level";
    ACCESS_DENIED = 25, "AccessDenied", "Insufficient trust level";
    STAF_REGISTRATION_ERROR = 26, "STAFRegistrationError", "Registration error";
    SERVICE_CONFIGURATION_ERROR = 27, "ServiceConfigurationError", "Service configuration error";
    QUEUE_FULL = 28, "QueueFull", "Queue full";
    NO_QUEUE_ELEMENT = 29, "NoQueueElement", "No queue element";
    NOTIFIEE_DOES_NOT_EXIST = 30, "NotifieeDoesNotExist", "Notifiee does not exist";
    INVALID_API_LEVEL = 31, "InvalidAPILevel", "Invalid API level";
    SERVICE_NOT_UNREGISTERABLE = 32, "ServiceNotUnregisterable", "Service not unregisterable";
    SERVICE_NOT_AVAILABLE = 33, "ServiceNotAvailable", "Service not available";
    SEMAPHORE_DOES_NOT_EXIST = 34, "SemaphoreDoesNotExist", "Semaphore does not exist";
    NOT_SEMAPHORE_OWNER = 35, "NotSemaphoreOwner", "Not semaphore owner";
    SEMAPHORE_HAS_PENDING_REQUESTS = 36, "SemaphoreHasPendingRequests", "Semaphore has pending requests";
    TIMEOUT = 37, "Timeout", "Timeout";
    JAVA_ERROR = 38, "JavaError", "Java error";
    CONVERTER_ERROR = 39, "ConverterError", "Converter error";
    MOVE_ERROR = 40, "MoveError", "Move error";
    INVALID_OBJECT = 41, "InvalidObject", "Invalid object";
    INVALID_PARM = 42, "InvalidParm", "Invalid parm";
    REQUEST_NUMBER_NOT_FOUND = 43, "RequestNumberNotFound", "Request number not found";
    INVALID_ASYNCH_OPTION = 44, "InvalidAsynchOption", "Invalid asynchronous option";
    REQUEST_NOT_COMPLETE = 45, "RequestNotComplete", "Request not complete";
    PROCESS_AUTHENTICATION_DENIED = 46, "ProcessAuthenticationDenied", "Process authentication denied";
    INVALID_VALUE = 47, "InvalidValue", "Invalid value";
    DOES_NOT_EXIST = 48, "DoesNotExist", "Does not exist";
    ALREADY_EXISTS = 49, "AlreadyExists", "Already exists";
    DIRECTORY_NOT_EMPTY = 50, "DirectoryNotEmpty", "Directory Not Empty";
    DIRECTORY_COPY_ERROR = 51, "DirectoryCopyError", "Directory Copy Error";
    DIAGNOSTICS_NOT_ENABLED = 52, "DiagnosticsNotEnabled", "Diagnostics Not Enabled";
    HANDLE_AUTHENTICATION_DENIED = 53, "HandleAuthenticationDenied", "Handle Authentication Denied";
    HANDLE_ALREADY_AUTHENTICATED = 54, "HandleAlreadyAuthenticated", "Handle Already Authenticated";
    INVALID_STAF_VERSION = 55, "InvalidSTAFVersion", "Invalid STAF Version";
    REQUEST_CANCELLED = 56, "RequestCancelled", "Request Cancelled";
    CREATE_THREAD_ERROR = 57, "CreateThreadError", "Create Thread Error";
    MAXIMUM_SIZE_EXCEEDED = 58, "MaximumSizeExceeded", "Maximum Size Exceeded";
    MAXIMUM_HANDLES_EXCEEDED = 59, "MaximumHandlesExceeded", "Maximum Handles Exceeded";
    NOT_REQUESTER = 60, "NotRequester", "Not Pending Requester";
}

/// Look up the table entry for `code`.
pub fn lookup(code: Rc) -> Option<&'static RcInfo> {
    TABLE.get(code as usize)
}

/// Description for `code`, or [`UNKNOWN_RC_DESCRIPTION`] for codes the table doesn't know.
pub fn strerror(code: Rc) -> &'static str {
    lookup(code).map_or(UNKNOWN_RC_DESCRIPTION, |info| info.description)
}

/// Symbolic name for `code` (e.g. `"UnknownService"`).
pub fn rc_name(code: Rc) -> Option<&'static str> {
    lookup(code).map(|info| info.name)
}

/// Reverse lookup by symbolic name.
pub fn rc_from_name(name: &str) -> Option<Rc> {
    TABLE.iter().find(|info| info.name == name).map(|info| info.code)
}

/// All known return codes, in code order.
pub fn all() -> &'static [RcInfo] {
    TABLE
}
