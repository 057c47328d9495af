pub mod bridge;
pub mod coap;
pub mod format;
pub mod rpc;
pub mod test_util;
pub mod transport;


#[cfg(test)]
mod test {
    use tracing::Level;

    #[ctor::ctor]
    fn init_test_logging() {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .try_init()
            .ok();
    }
}
