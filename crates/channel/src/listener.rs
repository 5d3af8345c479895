//! Platform listeners.
//!
//! Both variants accept connections as async byte streams; everything above
//! this module is transport agnostic.

use std::io;

use tokio::io::AsyncRead;

use crate::endpoint::Endpoint;

pub(crate) trait Incoming: AsyncRead + Unpin + Send + 'static {}

impl<T> Incoming for T where T: AsyncRead + Unpin + Send + 'static {}

#[cfg(unix)]
pub(crate) struct EndpointListener {
    inner: tokio::net::UnixListener,
}

#[cfg(unix)]
impl EndpointListener {
    pub(crate) fn bind(endpoint: &Endpoint) -> io::Result<Self> {
        let inner = tokio::net::UnixListener::bind(endpoint.path())?;
        Ok(Self { inner })
    }

    pub(crate) async fn accept(&mut self) -> io::Result<impl Incoming> {
        let (stream, _addr) = self.inner.accept().await?;
        Ok(stream)
    }
}

#[cfg(windows)]
pub(crate) struct EndpointListener {
    path: std::ffi::OsString,
    next: tokio::net::windows::named_pipe::NamedPipeServer,
}

#[cfg(windows)]
impl EndpointListener {
    pub(crate) fn bind(endpoint: &Endpoint) -> io::Result<Self> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let path = endpoint.path().as_os_str().to_owned();
        let next = ServerOptions::new()
            .first_pipe_instance(true)
            .create(&path)?;
        Ok(Self { path, next })
    }

    pub(crate) async fn accept(&mut self) -> io::Result<impl Incoming> {
        use tokio::net::windows::named_pipe::ServerOptions;

        self.next.connect().await?;
        // a pipe instance serves a single client, queue up the next one
        let next = ServerOptions::new().create(&self.path)?;
        Ok(std::mem::replace(&mut self.next, next))
    }
}
