//! Application-level test suites exercising the library the way the binary does.

mod playback_tests;
