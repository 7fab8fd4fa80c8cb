use std::time::Duration;

/// Line separating logical fields in every stdin/stdout exchange with
/// generators, validators and test-set files.
pub const RECORD_DELIMITER: &str = "!@#$%^&*()_ABCDEFG";

/// Flag appended to generator and validator command lines, followed by the delimiter.
pub const SEPARATOR_FLAG: &str = "--separator";

pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(5);

pub const BANNER_WIDTH: usize = 150;

pub const DATABASE_FILE_NAME: &str = "judgebox.sqlite";

pub const MANAGED_PROJECT_NAME: &str = "Solution";
pub const MANAGED_SOURCE_FILE: &str = "Program.cs";
pub const SLOT_LOCK_FILE: &str = ".lock";

pub const USER_TEST_PREFIX: &str = "U";
