//! `wl_compositor`: the surface and region factory.

use crate::error::Result;
use crate::object::{Dispatch, ObjectData, handle, no_events};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::region::{Region, RegionData};
use crate::protocol::registry::Bindable;
use crate::protocol::surface::{Surface, SurfaceData};
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::wl_opcode;

wl_opcode! {
    CompositorRequest("wl_compositor") {
        CreateSurface = 0,
        CreateRegion = 1,
    }
}

pub(crate) struct CompositorData {
    pub(crate) version: u32,
}

impl CompositorData {
    pub(crate) fn new(version: u32) -> Self {
        Self { version }
    }
}

impl Dispatch for CompositorData {
    fn dispatch(&self, _conn: &Connection, _id: ObjectId, message: Message) -> Result<()> {
        no_events(Self::INTERFACE, &message)
    }
}

handle! {
    /// The bound `wl_compositor` global.
    Compositor => CompositorData
}

impl Bindable for Compositor {
    const INTERFACE: &'static str = "wl_compositor";
    const VERSION: u32 = 6;

    fn from_id(conn: Connection, id: ObjectId) -> Self {
        Self::new(conn, id)
    }
}

impl Compositor {
    /// Creates a surface at the compositor's bound version.
    pub fn create_surface(&self) -> Result<Surface> {
        let version = self.data()?.version;
        let id = self.conn.create_object(SurfaceData::new(version).into_object())?;
        let mut args = Encoder::new();
        args.new_id(id);
        self.conn
            .send_request(self.id, CompositorRequest::CreateSurface, args)?;
        Ok(Surface::new(self.conn.clone(), id))
    }

    /// Creates an empty region, used for opaque and input areas.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="create_region">
    ///   <description summary="create new region">
    ///     Ask the compositor to create a new region.
    ///   </description>
    ///   <arg name="id" type="new_id" interface="wl_region" summary="the new region"/>
    /// </request>
    /// ```
    pub fn create_region(&self) -> Result<Region> {
        let version = self.data()?.version;
        let id = self.conn.create_object(RegionData::new(version).into_object())?;
        let mut args = Encoder::new();
        args.new_id(id);
        self.conn
            .send_request(self.id, CompositorRequest::CreateRegion, args)?;
        Ok(Region::new(self.conn.clone(), id))
    }
}
