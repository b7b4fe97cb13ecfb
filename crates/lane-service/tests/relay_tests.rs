//! Relay integration tests.
//!
//! Tracker hits fan out to every client socket; malformed frames are
//! answered (clients) or dropped (trackers) without closing the socket.

use common::types::{DeviceClass, LaneId, VenueId};
use lane_protocol::{HitEvent, ServerEvent};
use lane_test_utils::{
    create_code, join, watch_venue, TestHit, TestLaneServer, TestWsClient, LANE, VENUE,
};
use serde_json::json;
use std::time::Duration;

const SILENCE: Duration = Duration::from_millis(300);

#[tokio::test]
async fn test_tracker_hit_reaches_every_client() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let mut admin = TestWsClient::client(&server).await?;
    let mut user = TestWsClient::client(&server).await?;
    let mut tracker = TestWsClient::tracker(&server).await?;

    tracker
        .send_json(&TestHit::new(LANE, 0.5, 0.5).at(1000.0).build())
        .await?;

    let expected = ServerEvent::Hit(HitEvent {
        lane_id: LaneId::new(LANE),
        x: 0.5,
        y: 0.5,
        t: 1000.0,
        miss: false,
    });
    assert_eq!(admin.recv_event().await?, expected);
    assert_eq!(user.recv_event().await?, expected);

    Ok(())
}

#[tokio::test]
async fn test_untimed_miss_is_stamped_with_server_time() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let mut client = TestWsClient::client(&server).await?;
    let mut tracker = TestWsClient::tracker(&server).await?;

    tracker
        .send_json(&TestHit::new(LANE, 1.25, -0.5).miss().build())
        .await?;

    assert_eq!(
        client.recv_event().await?,
        ServerEvent::Hit(HitEvent {
            lane_id: LaneId::new(LANE),
            x: 1.25,
            y: -0.5,
            t: 1_700_000_000_000.0,
            miss: true,
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_malformed_tracker_event_is_not_broadcast() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let mut client = TestWsClient::client(&server).await?;
    let mut tracker = TestWsClient::tracker(&server).await?;

    tracker
        .send_json(&json!({"type": "rawHit", "laneId": LANE}))
        .await?;
    tracker.send_text("not json").await?;
    client.expect_silence(SILENCE).await?;

    // The tracker socket survives and keeps relaying.
    tracker
        .send_json(&TestHit::new(LANE, 0.1, 0.2).at(5.0).build())
        .await?;
    assert_eq!(client.recv_event().await?.name(), "hit");
    tracker.expect_silence(SILENCE).await?;

    Ok(())
}

#[tokio::test]
async fn test_binary_frames_are_read_as_json() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let mut client = TestWsClient::client(&server).await?;
    let mut tracker = TestWsClient::tracker(&server).await?;

    client
        .send_binary(serde_json::to_vec(&watch_venue(VENUE))?)
        .await?;
    assert_eq!(client.recv_event().await?.name(), "admin:venue:lanes");

    tracker
        .send_binary(TestHit::new(LANE, 0.5, 0.5).at(7.0).build().to_string().into_bytes())
        .await?;
    assert_eq!(client.recv_event().await?.name(), "hit");

    Ok(())
}

#[tokio::test]
async fn test_malformed_client_frame_gets_error_reply() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let mut client = TestWsClient::client(&server).await?;
    let malformed = ServerEvent::Error {
        code: 1,
        message: "Malformed message".to_string(),
    };

    client.send_text("{not json").await?;
    assert_eq!(client.recv_event().await?, malformed);

    client.send_json(&json!({"type": "admin:lanes:nuke"})).await?;
    assert_eq!(client.recv_event().await?, malformed);

    client.send_binary(vec![0xff, 0xfe, 0x00]).await?;
    assert_eq!(client.recv_event().await?, malformed);

    // Still connected.
    client.send_request(&watch_venue(VENUE)).await?;
    assert_eq!(client.recv_event().await?.name(), "admin:venue:lanes");

    Ok(())
}

#[tokio::test]
async fn test_missing_identifier_is_reported_to_requester_only() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let mut requester = TestWsClient::client(&server).await?;
    let mut bystander = TestWsClient::client(&server).await?;

    requester
        .send_json(&json!({"type": "admin:lane:close"}))
        .await?;
    assert_eq!(
        requester.recv_event().await?,
        ServerEvent::Error {
            code: 1,
            message: "laneId is required".to_string()
        }
    );
    bystander.expect_silence(SILENCE).await?;

    Ok(())
}

#[tokio::test]
async fn test_projector_transform_relays_to_others() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn_with_codes(["PROJ"]).await?;
    let mut admin = TestWsClient::client(&server).await?;
    admin.send_request(&create_code(VENUE, LANE)).await?;
    admin.recv_named("admin:pairCode:created").await?;

    let mut projector = TestWsClient::client(&server).await?;
    projector
        .send_request(&join("PROJ", DeviceClass::Projector, "device-projector"))
        .await?;
    let ServerEvent::PairingJoined { state, .. } =
        projector.recv_named("client:pairCode:joined").await?
    else {
        anyhow::bail!("Expected client:pairCode:joined");
    };
    assert!(state.paired_devices.projector);
    assert_eq!(state.venue_id, VenueId::new(VENUE));

    admin
        .send_json(&json!({"type": "getCurrentTargetTransform", "laneId": LANE}))
        .await?;
    assert_eq!(
        projector.recv_named("getCurrentTargetTransform").await?,
        ServerEvent::GetCurrentTransform {
            lane_id: LaneId::new(LANE)
        }
    );

    let transform = json!({"scale": 2.0, "rotation": 15});
    projector
        .send_json(&json!({
            "type": "currentTargetTransform",
            "laneId": LANE,
            "transform": transform
        }))
        .await?;
    assert_eq!(
        admin.recv_named("currentTargetTransform").await?,
        ServerEvent::CurrentTransform {
            lane_id: LaneId::new(LANE),
            transform,
        }
    );

    Ok(())
}
