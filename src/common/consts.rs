// Shared constants for the resolution and generation phases

// Built-in class names
pub const OBJECT: &str = "Object";
pub const STRING: &str = "String";
pub const THROWABLE: &str = "Throwable";
pub const EXCEPTION: &str = "Exception";
pub const RUNTIME_EXCEPTION: &str = "RuntimeException";
pub const ERROR: &str = "Error";
pub const ASSERTION_ERROR: &str = "AssertionError";

// Raw address types: one word and two words wide
pub const PTR: &str = "Ptr";
pub const FAR_PTR: &str = "FarPtr";

// Throwable roots whose subclasses need not be declared or caught
pub const UNCHECKED_ROOTS: &[&str] = &[RUNTIME_EXCEPTION, ERROR];

// Annotation forcing assert encoding for a method or a whole class
pub const CHECK_ASSERT_MARKER: &str = "CheckAssert";

// Words reserved in the method frame for one active exception frame
// (previous frame link, handler address, saved stack pointer)
pub const EXC_FRAME_WORDS: u32 = 3;

// Words between the frame pointer and the first parameter
// (saved frame pointer, return address)
pub const PARAM_BASE_WORDS: u32 = 2;

// Upper bound for superclass/interface walks
pub const MAX_HIERARCHY_STEPS: usize = 10_000;
