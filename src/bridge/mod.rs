pub mod alias;
pub mod channel;
pub mod config;
pub mod exchange;

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::bridge::channel::BridgeChannel;
    use crate::bridge::config::{BridgeConfig, Location, OperationConfig, OperationKind};
    use crate::bridge::exchange::Direction;
    use crate::rpc::message::RpcMessage;
    use crate::rpc::value::RpcValue;
    use crate::test_util::transport::in_memory_pair;
    use crate::test_util::wire::FixedLayoutCodec;

    fn test_config(ops: &[(&str, OperationConfig)]) -> Arc<BridgeConfig> {
        let mut config = BridgeConfig::new(Location::new("127.0.0.1", 5683));
        config.receive_timeout = Duration::from_secs(5);
        for (name, op) in ops {
            config.operations.insert(name.to_string(), op.clone());
        }
        Arc::new(config)
    }

    /// an output and an input channel wired back to back over an in-memory link
    fn channel_pair(ops: &[(&str, OperationConfig)]) -> (Arc<BridgeChannel>, Arc<BridgeChannel>) {
        let addr_client = SocketAddr::from_str("127.0.0.1:40001").unwrap();
        let addr_server = SocketAddr::from_str("127.0.0.1:40002").unwrap();
        let (transport_client, transport_server) = in_memory_pair(addr_client, addr_server);

        let client = Arc::new(BridgeChannel::new(
            Direction::Output,
            test_config(ops),
            addr_server,
            Arc::new(transport_client),
            Arc::new(FixedLayoutCodec),
        ));
        let server = Arc::new(BridgeChannel::new(
            Direction::Input,
            test_config(ops),
            addr_client,
            Arc::new(transport_server),
            Arc::new(FixedLayoutCodec),
        ));

        for channel in [&client, &server] {
            let channel = channel.clone();
            tokio::spawn(async move { channel.recv_loop().await });
        }
        (client, server)
    }

    #[tokio::test]
    async fn test_request_response_end_to_end() {
        let (client, server) = channel_pair(&[]);

        let serving = {
            let server = server.clone();
            tokio::spawn(async move {
                let request = server.receive().await.unwrap();
                assert_eq!(request.operation, "getTemp");
                assert_eq!(request.value, RpcValue::from("outside"));
                server.send(&RpcMessage::response(&request, RpcValue::from("21"))).await.unwrap();
            })
        };

        let request = RpcMessage::request("getTemp", "/", RpcValue::from("outside"));
        client.send(&request).await.unwrap();
        let response = client.receive().await.unwrap();

        assert_eq!(response.id, request.id);
        assert!(!response.is_fault());
        assert_eq!(response.value, RpcValue::from("21"));
        serving.await.unwrap();
    }

    #[tokio::test]
    async fn test_one_way_end_to_end() {
        let ops = [("logEvent", OperationConfig {
            kind: OperationKind::OneWay,
            ..Default::default()
        })];
        let (client, server) = channel_pair(&ops);

        let request = RpcMessage::request("logEvent", "/", RpcValue::from("started"));
        client.send(&request).await.unwrap();

        // the caller is released without any wire-level reply
        let reply = client.receive().await.unwrap();
        assert_eq!(reply.id, request.id);
        assert!(!reply.is_fault());

        // the notification still reaches the serving side
        let received = server.receive().await.unwrap();
        assert_eq!(received.operation, "logEvent");
        assert_eq!(received.value, RpcValue::from("started"));
    }

    #[tokio::test]
    async fn test_aliased_request_end_to_end() {
        let ops = [("setTemp", OperationConfig {
            aliases: vec!["/sensors/%{id}".to_string()],
            content_format: Some("application/json".to_string()),
            ..Default::default()
        })];
        let (client, server) = channel_pair(&ops);

        let serving = {
            let server = server.clone();
            tokio::spawn(async move {
                let request = server.receive().await.unwrap();
                // the path carries the substituted alias, the content only what was not consumed
                assert_eq!(request.operation, "sensors/7");
                assert_eq!(request.value.first_child("target"), Some(&RpcValue::from(21)));
                assert_eq!(request.value.first_child("id"), None);
                server.send(&RpcMessage::response(&request, RpcValue::empty())).await.unwrap();
            })
        };

        let mut value = RpcValue::empty();
        value.set_child("id", RpcValue::from("7"));
        value.set_child("target", RpcValue::from(21));

        client.send(&RpcMessage::request("setTemp", "/", value)).await.unwrap();
        let response = client.receive().await.unwrap();

        assert!(!response.is_fault());
        serving.await.unwrap();
    }
}
