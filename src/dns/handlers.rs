use crate::config::SharedConfig;
use crate::error::Error;
use crate::resolver::{Resolution, Resolver};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

#[derive(Clone)]
pub struct Handler {
    config: SharedConfig,
    resolver: Arc<Resolver>,
    shutdown: CancellationToken,
}

impl Handler {
    pub(super) fn new(
        config: SharedConfig,
        resolver: Arc<Resolver>,
        shutdown: CancellationToken,
    ) -> Self {
        Handler {
            config,
            resolver,
            shutdown,
        }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response: R,
    ) -> Result<ResponseInfo, Error> {
        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.handle_notimpl(request, response).await;
        }

        if self.config.log_requests {
            Self::log_request(request);
        }
        let queries = std::slice::from_ref(request.query());
        let resolution = self
            .resolver
            .resolve(queries, &self.shutdown.child_token())
            .await;
        if self.config.log_requests {
            Self::log_resolution(request, &resolution);
        }

        self.send_resolution(request, response, &resolution).await
    }

    async fn handle_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    async fn send_resolution<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        resolution: &Resolution,
    ) -> Result<ResponseInfo, Error> {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(
            header,
            resolution.answers.iter(),
            &[],
            resolution.authority.iter(),
            resolution.additionals.iter(),
        );
        Ok(response_handle.send_response(response).await?)
    }

    fn log_request(request: &Request) {
        let query = request.query();
        debug!(
            id = request.id(),
            src = %request.src(),
            name = %query.name(),
            query_type = %query.query_type(),
            "question"
        );
    }

    fn log_resolution(request: &Request, resolution: &Resolution) {
        info!(
            id = request.id(),
            name = %request.query().name(),
            answers = resolution.answers.len(),
            authority = resolution.authority.len(),
            additional = resolution.additionals.len(),
            "response"
        );
        for (section, records) in [
            ("answer", &resolution.answers),
            ("authority", &resolution.authority),
            ("additional", &resolution.additionals),
        ] {
            for record in records {
                info!(
                    id = request.id(),
                    section,
                    name = %record.name(),
                    record_type = %record.rr_type(),
                    data = ?record.data(),
                    "record"
                );
            }
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
