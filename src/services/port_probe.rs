use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

pub const LOCALHOST: &str = "127.0.0.1";

/// 状态查询时使用的连接超时
pub const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// 单次 TCP 连通性探测
///
/// 连接被拒绝或超时返回 `Ok(false)`；其他 I/O 错误原样返回，由调用方决定是否重试。
pub async fn probe(host: &str, port: u16, timeout: Duration) -> io::Result<bool> {
    if port == 0 {
        return Ok(false);
    }

    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(true),
        Ok(Err(e)) if is_unreachable(&e) => Ok(false),
        Ok(Err(e)) => Err(e),
        Err(_elapsed) => Ok(false),
    }
}

/// 探测本机端口，错误视为未开放
pub async fn is_port_open(port: u16, timeout: Duration) -> bool {
    probe(LOCALHOST, port, timeout).await.unwrap_or(false)
}

fn is_unreachable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset | io::ErrorKind::TimedOut
    )
}
