fn main() {
    // Host builds (tests) carry no ESP-IDF link environment and do not
    // compile embuild at all.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
