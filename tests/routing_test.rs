//! 读写分离路由集成测试
//!
//! 使用内存连接管理器，不依赖任何真实数据库

use rat_datasource::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Barrier;
use tokio_test::{assert_err, assert_ok};

fn pool_config(max_active: u32, max_wait_ms: u64) -> DataSourceResult<PoolConfig> {
    PoolConfig::builder()
        .initial_size(1)
        .min_idle(1)
        .max_active(max_active)
        .max_wait_ms(max_wait_ms)
        .connect_timeout_ms(1_000)
        .socket_timeout_ms(1_000)
        .time_between_eviction_runs_ms(60_000)
        .min_evictable_idle_time_ms(300_000)
        .max_evictable_idle_time_ms(900_000)
        .validation_query("SELECT 1")
        .test_while_idle(true)
        .test_on_borrow(false)
        .test_on_return(false)
        .build()
}

/// 默认数据源 D（MASTER）与从库 S（SLAVE）
async fn build_router(slave_max_wait_ms: u64) -> RoutingDataSource<MemoryConnectionManager> {
    rat_datasource::init();

    let config = RouterConfig::builder()
        .default_datasource(DataSourceKey::Master)
        .add_datasource(
            postgres_datasource(
                DataSourceKey::Master,
                "10.0.0.1",
                5432,
                "mysys",
                "admin",
                "secret",
                pool_config(8, 1_000).unwrap(),
            )
            .unwrap(),
        )
        .add_datasource(
            postgres_datasource(
                DataSourceKey::Slave,
                "10.0.0.2",
                5432,
                "mysys",
                "reader",
                "secret",
                pool_config(1, slave_max_wait_ms).unwrap(),
            )
            .unwrap(),
        )
        .build()
        .unwrap();

    RoutingDataSource::build(&config, &MemoryConnectionManager::for_config)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_default_then_slave_then_default() {
    let router = build_router(100).await;

    ContextScope::run(async {
        let conn = router.get_connection().await.unwrap();
        assert_eq!(conn.source, "MASTER");
        drop(conn);

        set_data_source(DataSourceKey::Slave);
        let conn = router.get_connection().await.unwrap();
        assert_eq!(conn.source, "SLAVE");
        assert_eq!(conn.key(), DataSourceKey::Slave);
        drop(conn);

        clear_data_source();
        let conn = router.get_connection().await.unwrap();
        assert_eq!(conn.source, "MASTER");
    })
    .await;

    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_replica_is_fatal() {
    let router = build_router(100).await;

    let err = assert_err!(with_data_source(DataSourceKey::Replica(2), router.get_connection()).await);
    assert!(matches!(err, DataSourceError::UnknownDataSource { .. }));
    assert!(err.is_fatal());

    // 注册表不受影响
    assert_eq!(
        router.registry().keys(),
        vec![DataSourceKey::Master, DataSourceKey::Slave]
    );
    router.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_tasks_see_only_their_own_key() {
    let router = build_router(1_000).await;
    let barrier = Arc::new(Barrier::new(2));

    let spawn_task = |key: DataSourceKey| {
        let router = router.clone();
        let barrier = barrier.clone();
        tokio::spawn(ContextScope::run(async move {
            set_data_source(key);
            // 两个任务都设置好键之后再读取
            barrier.wait().await;
            tokio::task::yield_now().await;
            let seen = current_data_source();
            let source = router.get_connection().await.map(|conn| conn.source.clone());
            clear_data_source();
            (seen, source)
        }))
    };

    let master = spawn_task(DataSourceKey::Master);
    let slave = spawn_task(DataSourceKey::Slave);

    let (seen, source) = master.await.unwrap();
    assert_eq!(seen, Some(DataSourceKey::Master));
    assert_eq!(source.unwrap(), "MASTER");

    let (seen, source) = slave.await.unwrap();
    assert_eq!(seen, Some(DataSourceKey::Slave));
    assert_eq!(source.unwrap(), "SLAVE");

    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_key_cleared_after_error_path() {
    let router = build_router(100).await;

    async fn failing_operation(
        router: &RoutingDataSource<MemoryConnectionManager>,
    ) -> DataSourceResult<()> {
        let _guard = DataSourceGuard::new(DataSourceKey::Replica(7));
        router.get_connection().await?;
        Ok(())
    }

    ContextScope::run(async {
        assert!(failing_operation(&router).await.is_err());
        assert_eq!(current_data_source(), None);
        assert_eq!(router.get_connection().await.unwrap().source, "MASTER");
    })
    .await;

    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_saturated_slave_times_out_while_master_serves() {
    let router = build_router(50).await;

    let held = router
        .read_only(async { router.get_connection().await })
        .await
        .unwrap();
    assert_eq!(held.source, "SLAVE");

    // 从库等待期间主库请求同时进行
    let (slave, master) = tokio::join!(
        async {
            let started = Instant::now();
            let result = router.read_only(async { router.get_connection().await }).await;
            (result, started.elapsed())
        },
        async {
            let started = Instant::now();
            let result = router.get_connection().await;
            (result, started.elapsed())
        }
    );

    let (result, waited) = slave;
    match result {
        Err(DataSourceError::PoolExhausted { key, waited_ms }) => {
            assert_eq!(key, DataSourceKey::Slave);
            assert!(waited_ms >= 45, "waited_ms={}", waited_ms);
        }
        other => panic!("unexpected result: {:?}", other.map(|conn| conn.id)),
    }
    assert!(waited >= Duration::from_millis(45));
    assert!(waited < Duration::from_secs(2));

    let (result, elapsed) = master;
    let conn = result.unwrap();
    assert_eq!(conn.source, "MASTER");
    assert!(elapsed < Duration::from_millis(20), "elapsed={:?}", elapsed);
    assert!(elapsed < waited);

    drop(held);
    drop(conn);
    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_wait_leaves_no_key_and_frees_slot() {
    let router = build_router(1_000).await;
    let held = router
        .get_connection_from(DataSourceKey::Slave)
        .await
        .unwrap();

    let pending = with_data_source(DataSourceKey::Slave, router.get_connection());
    assert!(
        tokio::time::timeout(Duration::from_millis(20), pending)
            .await
            .is_err()
    );
    assert_eq!(current_data_source(), None);

    drop(held);
    let conn = tokio::time::timeout(
        Duration::from_millis(200),
        router.read_only(async { router.get_connection().await }),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(conn.source, "SLAVE");

    drop(conn);
    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pool_and_router_are_interchangeable_sources() {
    let router = build_router(100).await;
    let slave_pool = router.registry().resolve(Some(DataSourceKey::Slave)).unwrap();

    async fn source_label<S>(source: &S) -> String
    where
        S: ConnectionSource<Manager = MemoryConnectionManager>,
    {
        source.get_connection().await.unwrap().source.clone()
    }

    assert_eq!(source_label(&router).await, "MASTER");
    assert_eq!(source_label(slave_pool.as_ref()).await, "SLAVE");

    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_router_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("datasources.toml");

    let config = RouterConfig::builder()
        .default_datasource(DataSourceKey::Master)
        .add_datasource(
            sqlite_datasource(DataSourceKey::Master, "./master.db", pool_config(2, 100).unwrap())
                .unwrap(),
        )
        .add_datasource(
            sqlite_datasource(DataSourceKey::Replica(1), "./replica1.db", pool_config(2, 100).unwrap())
                .unwrap(),
        )
        .build()
        .unwrap();
    config.save_to_file(&path).unwrap();

    let loaded = RouterConfig::from_file(&path).unwrap();
    let router = RoutingDataSource::build(&loaded, &MemoryConnectionManager::for_config)
        .await
        .unwrap();

    let conn = assert_ok!(with_data_source(DataSourceKey::Replica(1), router.get_connection()).await);
    assert_eq!(conn.source, "REPLICA1");
    drop(conn);

    let health = router.registry().health_check().await;
    assert!(health.values().all(|healthy| *healthy));

    assert_ok!(router.shutdown().await);
    // 重复关闭不会报错
    assert_ok!(router.shutdown().await);
}

#[tokio::test]
async fn test_unscoped_key_does_not_route_sibling_task() {
    let router = build_router(100).await;
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

    let writer = {
        let router = router.clone();
        tokio::spawn(async move {
            set_data_source(DataSourceKey::Slave);
            let _ = ready_tx.send(());
            let _ = done_rx.await;
            router.get_connection().await.map(|conn| conn.source.clone())
        })
    };

    ready_rx.await.unwrap();
    assert_eq!(current_data_source(), None);
    assert_eq!(router.get_connection().await.unwrap().source, "MASTER");
    let _ = done_tx.send(());

    // 没有任务作用域时写入被拒绝，写入方自己也走默认数据源
    assert_eq!(writer.await.unwrap().unwrap(), "MASTER");
    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_guard_in_local_task_does_not_route_sibling() {
    let router = build_router(100).await;
    let local = tokio::task::LocalSet::new();

    let sibling_source = local
        .run_until(async {
            let holder = {
                let router = router.clone();
                tokio::task::spawn_local(async move {
                    let _guard = DataSourceGuard::new(DataSourceKey::Slave);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    drop(router);
                })
            };
            let sibling = {
                let router = router.clone();
                tokio::task::spawn_local(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    router.get_connection().await.map(|conn| conn.source.clone())
                })
            };
            let source = sibling.await.unwrap();
            holder.await.unwrap();
            source
        })
        .await;

    assert_eq!(sibling_source.unwrap(), "MASTER");
    router.shutdown().await.unwrap();
}
