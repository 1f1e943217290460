//! End-to-end pipeline tests: a build pipeline publishing a channel set
//! and a probe pipeline that starts first and waits on it.

use std::sync::Arc;

use veloq_common::{DriverId, EngineConfig, MetricsRegistry, OperatorId, PipelineId, QueryId};
use veloq_data::{BlockBuilder, Datum, Page, BIGINT};
use veloq_exec::operators::{
    PageBuffer, PageBufferSinkOperator, PageBufferSourceOperator, SetBuilderOperatorFactory,
    SetProbeOperatorFactory, ValuesOperator,
};
use veloq_exec::{Driver, Operator, OperatorFactory, PipelineContext, TaskRunner};

fn bigint_page(values: &[Option<i64>]) -> Page {
    let mut builder = BlockBuilder::new(&BIGINT);
    for v in values {
        match v {
            Some(v) => builder.append_long(*v).unwrap(),
            None => builder.append_null(),
        }
    }
    Page::single(builder.build())
}

fn ctx(metrics: &MetricsRegistry, pipeline: u32) -> PipelineContext {
    PipelineContext::new(
        QueryId(42),
        PipelineId(pipeline),
        EngineConfig::default(),
        metrics.clone(),
    )
}

#[tokio::test]
async fn probe_pipeline_waits_for_build_side_set() {
    let metrics = MetricsRegistry::new();
    let build_ctx = ctx(&metrics, 0);
    let probe_ctx = ctx(&metrics, 1);

    // build side: values -> set builder (publishes on finish)
    let builder_factory = SetBuilderOperatorFactory::new(OperatorId(0), &BIGINT, 0);
    // probe side wired before the build side has produced anything
    let probe_factory =
        SetProbeOperatorFactory::new(OperatorId(1), builder_factory.supplier(), 0);

    let build_operators: Vec<Box<dyn Operator>> = vec![
        Box::new(ValuesOperator::new(vec![
            bigint_page(&[Some(1), Some(2), Some(2), Some(3)]),
            bigint_page(&[Some(3), Some(4)]),
        ])),
        builder_factory.create(&build_ctx).expect("build operator"),
    ];
    let build_driver = Driver::new(build_ctx, DriverId(0), build_operators).expect("build driver");

    let output = PageBuffer::with_capacity(8);
    let probe_operators: Vec<Box<dyn Operator>> = vec![
        Box::new(ValuesOperator::new(vec![bigint_page(&[
            Some(0),
            Some(1),
            Some(2),
            Some(3),
            Some(4),
            Some(5),
        ])])),
        probe_factory.create(&probe_ctx).expect("probe operator"),
        Box::new(PageBufferSinkOperator::new(output.clone())),
    ];
    let probe_driver = Driver::new(probe_ctx, DriverId(1), probe_operators).expect("probe driver");

    // probe driver is listed first and must suspend until the set arrives
    let runner = TaskRunner::new(2);
    runner
        .run_drivers(vec![probe_driver, build_driver])
        .await
        .expect("run drivers");

    assert!(output.is_finished());
    let page = output.pop().expect("probed output page");
    assert!(output.pop().is_none());

    let membership = page.block(1).expect("membership channel");
    let expected = [false, true, true, true, true, false];
    for (position, expected) in expected.iter().enumerate() {
        assert_eq!(
            membership.value_at(position).unwrap(),
            Datum::Boolean(*expected),
            "position {position}"
        );
    }
}

#[tokio::test]
async fn bounded_buffer_applies_backpressure_between_pipelines() {
    let metrics = MetricsRegistry::new();
    let producer_ctx = ctx(&metrics, 0);
    let consumer_ctx = ctx(&metrics, 1);

    // producer emits more pages than the exchange buffer can hold
    let exchange = PageBuffer::with_capacity(1);
    let pages = (0..6)
        .map(|v| bigint_page(&[Some(v)]))
        .collect::<Vec<_>>();
    let producer_operators: Vec<Box<dyn Operator>> = vec![
        Box::new(ValuesOperator::new(pages)),
        Box::new(PageBufferSinkOperator::new(exchange.clone())),
    ];
    let producer =
        Driver::new(producer_ctx, DriverId(0), producer_operators).expect("producer driver");

    let sink = PageBuffer::with_capacity(16);
    let consumer_operators: Vec<Box<dyn Operator>> = vec![
        Box::new(PageBufferSourceOperator::new(exchange.clone())),
        Box::new(PageBufferSinkOperator::new(sink.clone())),
    ];
    let consumer =
        Driver::new(consumer_ctx, DriverId(1), consumer_operators).expect("consumer driver");

    TaskRunner::new(1)
        .run_drivers(vec![producer, consumer])
        .await
        .expect("run drivers");

    assert!(sink.is_finished());
    let mut values = Vec::new();
    while let Some(page) = sink.pop() {
        values.push(page.block(0).unwrap().get_long(0).unwrap());
    }
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn producer_driver_blocks_until_consumer_drains() {
    let metrics = MetricsRegistry::new();
    let producer_ctx = ctx(&metrics, 0);

    let exchange = PageBuffer::with_capacity(1);
    let producer_operators: Vec<Box<dyn Operator>> = vec![
        Box::new(ValuesOperator::new(vec![
            bigint_page(&[Some(1)]),
            bigint_page(&[Some(2)]),
        ])),
        Box::new(PageBufferSinkOperator::new(exchange.clone())),
    ];
    let mut producer =
        Driver::new(producer_ctx, DriverId(0), producer_operators).expect("producer driver");

    // first page fills the buffer
    while producer.step().expect("step") {}
    assert!(!producer.is_finished());
    assert!(!producer.blocked().is_ready());

    // draining resolves the blocked signal and lets the chain finish
    assert!(exchange.pop().is_some());
    assert!(producer.blocked().is_ready());
    producer.run().await.expect("finish producer");
    assert!(producer.is_finished());
}
